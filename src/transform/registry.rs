use super::{PassOutcome, SubstituteClassTemplateParam, TransformError};
use crate::buffer::SourceBuffer;
use crate::config::{ConfigError, PassConfig};
use crate::model::ProgramModel;

/// A reduction pass the driver can run by name.
pub trait Transformation {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Runs one instance of the pass against `program`, editing `buffer`
    /// (which starts as a copy of the program's source) at most once.
    fn transform(
        &mut self,
        program: &dyn ProgramModel,
        buffer: &mut SourceBuffer,
        config: &PassConfig,
    ) -> Result<PassOutcome, TransformError>;
}

/// `(name, description)` of every registered pass.
pub fn available() -> Vec<(&'static str, &'static str)> {
    vec![(SubstituteClassTemplateParam::NAME, SubstituteClassTemplateParam::DESCRIPTION)]
}

pub fn lookup(name: &str) -> Result<Box<dyn Transformation>, ConfigError> {
    match name {
        SubstituteClassTemplateParam::NAME => Ok(Box::new(SubstituteClassTemplateParam::new())),
        _ => Err(ConfigError::UnknownTransformation {
            name: name.to_string(),
            available: available().iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_registered_pass() {
        let pass = lookup("substitute-class-template-param").unwrap();
        assert_eq!(pass.name(), "substitute-class-template-param");
        assert!(pass.description().contains("template arguments"));
    }

    #[test]
    fn unknown_name_lists_alternatives() {
        let err = lookup("remove-unused-function").err().unwrap();
        assert_eq!(
            err.to_string(),
            "unknown transformation 'remove-unused-function' (available: substitute-class-template-param)"
        );
    }
}
