//! Producer-side API for well-formed opcode streams

use std::rc::Rc;

use super::{Expr, Opcode, Template};

/// Builds a [`Template`] one opcode at a time.
///
/// ```
/// use morphling::{Expr, TemplateBuilder};
///
/// // <div class="{{value}}">hello</div>
/// let template = TemplateBuilder::new()
///     .element("div", |div| div.dynamic_attr("class", Expr::path("value")).text("hello"))
///     .build();
/// assert_eq!(template.opcodes().len(), 4);
/// ```
#[derive(Debug, Default)]
pub struct TemplateBuilder {
    opcodes: Vec<Opcode>,
    block_params: Vec<String>,
    blocks: Vec<Rc<Template>>,
}

impl TemplateBuilder {
    /// Start an empty template
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw opcode
    pub fn opcode(mut self, opcode: Opcode) -> Self {
        self.opcodes.push(opcode);
        self
    }

    /// Static text
    pub fn text(self, text: impl Into<String>) -> Self {
        self.opcode(Opcode::Text(text.into()))
    }

    /// Static comment
    pub fn comment(self, text: impl Into<String>) -> Self {
        self.opcode(Opcode::Comment(text.into()))
    }

    /// Open an element
    pub fn open_element(self, tag: impl Into<String>) -> Self {
        self.opcode(Opcode::OpenElement(tag.into()))
    }

    /// Close the innermost element
    pub fn close_element(self) -> Self {
        self.opcode(Opcode::CloseElement)
    }

    /// Open `tag`, let `body` fill it, then close it.
    pub fn element(self, tag: impl Into<String>, body: impl FnOnce(Self) -> Self) -> Self {
        body(self.open_element(tag)).close_element()
    }

    /// Static attribute on the open element
    pub fn attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.opcode(Opcode::StaticAttr {
            name: name.into(),
            value: value.into(),
        })
    }

    /// Computed attribute on the open element
    pub fn dynamic_attr(self, name: impl Into<String>, value: Expr) -> Self {
        self.opcode(Opcode::DynamicAttr {
            name: name.into(),
            value,
        })
    }

    /// Computed property on the open element
    pub fn property(self, name: impl Into<String>, value: Expr) -> Self {
        self.opcode(Opcode::DynamicProp {
            name: name.into(),
            value,
        })
    }

    /// `{{value}}`
    pub fn append(self, value: Expr) -> Self {
        self.opcode(Opcode::Append {
            value,
            trusting: false,
        })
    }

    /// `{{{value}}}`
    pub fn append_trusted(self, value: Expr) -> Self {
        self.opcode(Opcode::Append {
            value,
            trusting: true,
        })
    }

    /// A block invocation. Its templates are added to the block table.
    pub fn block(mut self, block: BlockBuilder) -> Self {
        let template = block.template.map(|t| self.push_block(t));
        let inverse = block.inverse.map(|t| self.push_block(t));
        self.opcode(Opcode::Block {
            helper: block.helper,
            params: block.params,
            hash: block.hash,
            template,
            inverse,
        })
    }

    /// A component invocation
    pub fn component(self, name: impl Into<String>, hash: Vec<(String, Expr)>) -> Self {
        self.opcode(Opcode::Component {
            name: name.into(),
            hash,
        })
    }

    /// Declare the block parameters this template binds when yielded to.
    pub fn block_params<S: Into<String>>(mut self, params: impl IntoIterator<Item = S>) -> Self {
        self.block_params = params.into_iter().map(Into::into).collect();
        self
    }

    fn push_block(&mut self, template: Template) -> usize {
        self.blocks.push(Rc::new(template));
        self.blocks.len() - 1
    }

    /// Finish the template
    pub fn build(self) -> Template {
        Template {
            opcodes: self.opcodes,
            block_params: self.block_params,
            blocks: self.blocks,
        }
    }
}

/// Describes one `{{#helper}}` invocation for [`TemplateBuilder::block`].
#[derive(Debug)]
pub struct BlockBuilder {
    helper: String,
    params: Vec<Expr>,
    hash: Vec<(String, Expr)>,
    template: Option<Template>,
    inverse: Option<Template>,
}

impl BlockBuilder {
    /// Invoke the block helper `helper`
    pub fn new(helper: impl Into<String>) -> Self {
        Self {
            helper: helper.into(),
            params: Vec::new(),
            hash: Vec::new(),
            template: None,
            inverse: None,
        }
    }

    /// Add a positional parameter
    pub fn param(mut self, param: Expr) -> Self {
        self.params.push(param);
        self
    }

    /// Add a named parameter
    pub fn hash(mut self, name: impl Into<String>, value: Expr) -> Self {
        self.hash.push((name.into(), value));
        self
    }

    /// The main template
    pub fn template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }

    /// The `{{else}}` template
    pub fn inverse(mut self, inverse: Template) -> Self {
        self.inverse = Some(inverse);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_balances() {
        let template = TemplateBuilder::new()
            .element("ul", |ul| ul.element("li", |li| li.text("x")))
            .build();
        let opens = template
            .opcodes()
            .iter()
            .filter(|op| matches!(op, Opcode::OpenElement(_)))
            .count();
        let closes = template
            .opcodes()
            .iter()
            .filter(|op| matches!(op, Opcode::CloseElement))
            .count();
        assert_eq!(opens, 2);
        assert_eq!(closes, 2);
    }

    #[test]
    fn test_block_indices_point_into_table() {
        let template = TemplateBuilder::new()
            .block(
                BlockBuilder::new("if")
                    .param(Expr::path("condition"))
                    .template(TemplateBuilder::new().text("yes").build())
                    .inverse(TemplateBuilder::new().text("no").build()),
            )
            .build();

        assert_eq!(template.block_count(), 2);
        match &template.opcodes()[0] {
            Opcode::Block {
                helper,
                template: Some(t),
                inverse: Some(i),
                ..
            } => {
                assert_eq!(helper, "if");
                assert!(template.block(*t).is_some());
                assert!(template.block(*i).is_some());
                assert_ne!(t, i);
            }
            other => panic!("unexpected opcode {:?}", other),
        }
    }

    #[test]
    fn test_path_splits_segments() {
        match Expr::path("person.name.first") {
            Expr::Path(parts) => assert_eq!(parts, vec!["person", "name", "first"]),
            other => panic!("unexpected expr {:?}", other),
        }
    }
}
