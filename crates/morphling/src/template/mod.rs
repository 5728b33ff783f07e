//! Compiled templates: the opcode stream the runtime executes

mod builder;

pub use builder::{BlockBuilder, TemplateBuilder};

use std::rc::Rc;

use crate::value::Value;

/// An expression inside a mustache, attribute or block invocation.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A literal value
    Literal(Value),

    /// A property path. The first segment may name a block parameter or
    /// `this`; otherwise the path is read from the self context.
    Path(Vec<String>),

    /// A call to a registered helper
    Helper {
        /// Helper name
        name: String,
        /// Positional parameters
        params: Vec<Expr>,
        /// Named parameters, in source order
        hash: Vec<(String, Expr)>,
    },

    /// String interpolation such as `class="hello {{value}}"`
    Concat(Vec<Expr>),
}

impl Expr {
    /// A dotted path such as `person.name.first`.
    pub fn path(path: &str) -> Self {
        Expr::Path(
            path.split('.')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// A literal
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// A helper call with positional parameters only
    pub fn helper(name: impl Into<String>, params: Vec<Expr>) -> Self {
        Expr::Helper {
            name: name.into(),
            params,
            hash: Vec::new(),
        }
    }

    /// A helper call with positional and named parameters
    pub fn helper_with_hash(
        name: impl Into<String>,
        params: Vec<Expr>,
        hash: Vec<(String, Expr)>,
    ) -> Self {
        Expr::Helper {
            name: name.into(),
            params,
            hash,
        }
    }

    /// Interpolate parts into one string
    pub fn concat(parts: Vec<Expr>) -> Self {
        Expr::Concat(parts)
    }
}

/// One instruction of a compiled template.
///
/// Element opcodes must balance: every `OpenElement` is closed by a
/// `CloseElement`, and attribute opcodes apply to the innermost open element.
#[derive(Debug, Clone)]
pub enum Opcode {
    /// Static text
    Text(String),

    /// Static comment
    Comment(String),

    /// Open an element; following opcodes fill it until `CloseElement`
    OpenElement(String),

    /// Static attribute on the open element
    StaticAttr {
        /// Attribute name
        name: String,
        /// Attribute value
        value: String,
    },

    /// Attribute whose value is computed
    DynamicAttr {
        /// Attribute name
        name: String,
        /// Value expression
        value: Expr,
    },

    /// Element property whose value is computed
    DynamicProp {
        /// Property name
        name: String,
        /// Value expression
        value: Expr,
    },

    /// Close the innermost open element
    CloseElement,

    /// `{{value}}` (escaped) or `{{{value}}}` (trusting)
    Append {
        /// Content expression
        value: Expr,
        /// Whether the value is inserted as HTML
        trusting: bool,
    },

    /// `{{#helper params hash}}...{{else}}...{{/helper}}`
    Block {
        /// Block helper name
        helper: String,
        /// Positional parameters
        params: Vec<Expr>,
        /// Named parameters
        hash: Vec<(String, Expr)>,
        /// Index of the main template in the block table
        template: Option<usize>,
        /// Index of the inverse template in the block table
        inverse: Option<usize>,
    },

    /// A registered component
    Component {
        /// Component name
        name: String,
        /// Attributes passed to the component
        hash: Vec<(String, Expr)>,
    },
}

/// A compiled template: an opcode stream plus the nested templates its
/// blocks refer to by index.
#[derive(Debug, Clone, Default)]
pub struct Template {
    opcodes: Vec<Opcode>,
    block_params: Vec<String>,
    blocks: Vec<Rc<Template>>,
}

impl Template {
    /// A template without nested blocks
    pub fn new(opcodes: Vec<Opcode>) -> Self {
        Self {
            opcodes,
            block_params: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// A template with a table of nested block templates
    pub fn with_blocks(opcodes: Vec<Opcode>, blocks: Vec<Template>) -> Self {
        Self {
            opcodes,
            block_params: Vec::new(),
            blocks: blocks.into_iter().map(Rc::new).collect(),
        }
    }

    /// Declare the block parameters (`as |item index|`) this template binds.
    pub fn with_block_params<S: Into<String>>(mut self, params: impl IntoIterator<Item = S>) -> Self {
        self.block_params = params.into_iter().map(Into::into).collect();
        self
    }

    /// The opcode stream
    pub fn opcodes(&self) -> &[Opcode] {
        &self.opcodes
    }

    /// Names bound by this template when it is yielded to
    pub fn block_params(&self) -> &[String] {
        &self.block_params
    }

    /// Nested template at `index` in the block table
    pub fn block(&self, index: usize) -> Option<&Rc<Template>> {
        self.blocks.get(index)
    }

    /// Number of nested templates
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}
