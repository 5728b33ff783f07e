//! Attribute and property morphs

use tracing::trace;

use crate::dom::NodeId;
use crate::environment::Environment;
use crate::error::Result;
use crate::eval::Expression;
use crate::value::Value;

/// The attribute text for `value`, or `None` when the attribute is absent.
fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::Undefined | Value::Null | Value::Bool(false) => None,
        other => Some(other.to_string()),
    }
}

pub(crate) struct AttributeMorph {
    element: NodeId,
    name: String,
    expression: Expression,
    last_value: Value,
    rendered: Option<String>,
}

impl AttributeMorph {
    pub(crate) fn render(
        env: &Environment,
        element: NodeId,
        name: &str,
        expression: Expression,
    ) -> Result<Self> {
        let value = expression.value()?;
        let rendered = attribute_text(&value);
        if let Some(text) = &rendered {
            env.dom().set_attribute(element, name, text)?;
        }
        Ok(Self {
            element,
            name: name.to_string(),
            expression,
            last_value: value,
            rendered,
        })
    }

    pub(crate) fn element(&self) -> NodeId {
        self.element
    }

    pub(crate) fn last_value(&self) -> Value {
        self.last_value.clone()
    }

    pub(crate) fn rerender(&mut self, env: &Environment) -> Result<()> {
        if !self.expression.is_dirty() {
            return Ok(());
        }
        let value = self.expression.value()?;
        let rendered = attribute_text(&value);
        self.last_value = value;
        if rendered == self.rendered {
            return Ok(());
        }

        match &rendered {
            Some(text) => env.dom().set_attribute(self.element, &self.name, text)?,
            None => env.dom().remove_attribute(self.element, &self.name)?,
        }
        trace!(element = %self.element, attribute = %self.name, "patched attribute");
        self.rendered = rendered;
        Ok(())
    }
}

pub(crate) struct PropertyMorph {
    element: NodeId,
    name: String,
    expression: Expression,
    last_value: Value,
}

impl PropertyMorph {
    pub(crate) fn render(
        env: &Environment,
        element: NodeId,
        name: &str,
        expression: Expression,
    ) -> Result<Self> {
        let value = expression.value()?;
        env.dom().set_property(element, name, value.clone())?;
        Ok(Self {
            element,
            name: name.to_string(),
            expression,
            last_value: value,
        })
    }

    pub(crate) fn element(&self) -> NodeId {
        self.element
    }

    pub(crate) fn last_value(&self) -> Value {
        self.last_value.clone()
    }

    pub(crate) fn rerender(&mut self, env: &Environment) -> Result<()> {
        if !self.expression.is_dirty() {
            return Ok(());
        }
        let value = self.expression.value()?;
        if value.identical(&self.last_value) {
            return Ok(());
        }
        env.dom().set_property(self.element, &self.name, value.clone())?;
        trace!(element = %self.element, property = %self.name, "patched property");
        self.last_value = value;
        Ok(())
    }
}
