//! The interactive input form.
//!
//! Each line read from the session input is one [`Command`]. Field edits are
//! parsed and clamped; a prediction runs on `predict`, or after every edit when
//! auto-predict is on. Failures are reported and the session keeps going.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use log::{error, info};

use crate::classifier::CategoryClassifier;
use crate::features::{AppInputs, FeatureError, FormField};
use crate::render;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("Unknown command: {0} (type `help` for the list of commands)")]
    UnknownCommand(String),
    #[error("Missing value for {0}")]
    MissingValue(String),
    #[error(transparent)]
    Feature(#[from] FeatureError),
}

/// Current field values plus the auto-predict switch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputForm {
    initial: AppInputs,
    inputs: AppInputs,
    auto_predict: bool,
}

impl InputForm {
    /// A form whose fields start at `inputs`; [`reset`](Self::reset) returns to them.
    pub fn new(inputs: AppInputs) -> Self {
        Self {
            initial: inputs.clone(),
            inputs,
            auto_predict: false,
        }
    }

    pub fn with_auto_predict(mut self, auto_predict: bool) -> Self {
        self.auto_predict = auto_predict;
        self
    }

    pub fn auto_predict(&self) -> bool {
        self.auto_predict
    }

    /// Parses `raw` for `field` and stores the clamped value.
    pub fn set(&mut self, field: FormField, raw: &str) -> Result<(), FeatureError> {
        field.apply(&mut self.inputs, raw)
    }

    /// The values the next prediction will use.
    pub fn values(&self) -> &AppInputs {
        &self.inputs
    }

    /// Restores the values the form was created with.
    pub fn reset(&mut self) {
        self.inputs = self.initial.clone();
    }
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set { field: FormField, value: String },
    Predict,
    Show,
    Reset,
    Help,
    Quit,
    Empty,
}

impl FromStr for Command {
    type Err = FormError;

    /// Accepts `set <field> <value>`, `<field>=<value>`, `<field> <value>` and
    /// the bare words `predict`, `show`, `reset`, `help`, `quit`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Command::Empty);
        }

        if let Some((field, value)) = line.split_once('=') {
            return set_command(field, value);
        }

        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default();
        let rest: Vec<&str> = words.collect();
        match (head.to_ascii_lowercase().as_str(), rest.as_slice()) {
            ("predict" | "p", []) => Ok(Command::Predict),
            ("show" | "s", []) => Ok(Command::Show),
            ("reset", []) => Ok(Command::Reset),
            ("help" | "h" | "?", []) => Ok(Command::Help),
            ("quit" | "exit" | "q", []) => Ok(Command::Quit),
            ("set", [field]) => Err(FormError::MissingValue(field.to_string())),
            ("set", [field, value]) => set_command(field, value),
            (_, [value]) if head.parse::<FormField>().is_ok() => set_command(head, value),
            (_, []) if head.parse::<FormField>().is_ok() => Err(FormError::MissingValue(head.to_string())),
            _ => Err(FormError::UnknownCommand(line.to_string())),
        }
    }
}

fn set_command(field: &str, value: &str) -> Result<Command, FormError> {
    let field = field.trim().parse::<FormField>()?;
    let value = value.trim();
    if value.is_empty() {
        return Err(FormError::MissingValue(field.key().to_string()));
    }
    Ok(Command::Set {
        field,
        value: value.to_string(),
    })
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    pub predictions: usize,
    pub failures: usize,
}

/// Runs the interactive form until `quit` or end of input.
///
/// Only I/O errors on `output` end the session early; invalid commands and
/// failed predictions are written to `output` and the loop continues.
pub fn run_session<R: BufRead, W: Write>(
    classifier: &CategoryClassifier,
    form: &mut InputForm,
    input: R,
    output: &mut W,
    show_row: bool,
) -> io::Result<SessionSummary> {
    let mut summary = SessionSummary::default();
    write!(output, "{}", render::form(form.values()))?;
    write_help(output)?;

    for line in input.lines() {
        let line = line?;
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                writeln!(output, "Error: {}", e)?;
                continue;
            }
        };

        let predict = match command {
            Command::Empty => false,
            Command::Quit => break,
            Command::Help => {
                write_help(output)?;
                false
            }
            Command::Show => {
                write!(output, "{}", render::form(form.values()))?;
                false
            }
            Command::Reset => {
                form.reset();
                write!(output, "{}", render::form(form.values()))?;
                form.auto_predict()
            }
            Command::Predict => true,
            Command::Set { field, value } => match form.set(field, &value) {
                Ok(()) => {
                    writeln!(output, "{} = {}", field.label(), field.display_value(form.values()))?;
                    form.auto_predict()
                }
                Err(e) => {
                    writeln!(output, "Error: {}", e)?;
                    false
                }
            },
        };

        if predict {
            if predict_once(classifier, form.values(), output, show_row)? {
                summary.predictions += 1;
            } else {
                summary.failures += 1;
            }
        }
    }

    info!(
        "Session ended after {} predictions ({} failed)",
        summary.predictions + summary.failures,
        summary.failures
    );
    Ok(summary)
}

/// Predicts and writes the result. Returns whether the prediction succeeded.
pub fn predict_once<W: Write>(
    classifier: &CategoryClassifier,
    inputs: &AppInputs,
    output: &mut W,
    show_row: bool,
) -> io::Result<bool> {
    match classifier.predict(inputs) {
        Ok(prediction) => {
            write!(output, "{}", render::prediction(&prediction))?;
            if show_row {
                write!(output, "{}", render::row(&prediction.row))?;
            }
            Ok(true)
        }
        Err(e) => {
            error!("Prediction failed: {}", e);
            write!(output, "{}", render::failure(&e))?;
            Ok(false)
        }
    }
}

fn write_help<W: Write>(output: &mut W) -> io::Result<()> {
    let fields: Vec<&str> = FormField::ALL.iter().map(|f| f.key()).collect();
    writeln!(output, "Commands: <field>=<value> | set <field> <value> | predict | show | reset | help | quit")?;
    writeln!(output, "Fields: {}", fields.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_forms() {
        let set = Command::Set {
            field: FormField::SizeMb,
            value: "42.5".into(),
        };
        assert_eq!("set size-mb 42.5".parse::<Command>().unwrap(), set);
        assert_eq!("size-mb=42.5".parse::<Command>().unwrap(), set);
        assert_eq!(" size_mb = 42.5 ".parse::<Command>().unwrap(), set);
        assert_eq!("size-mb 42.5".parse::<Command>().unwrap(), set);
        assert_eq!("PREDICT".parse::<Command>().unwrap(), Command::Predict);
        assert_eq!("".parse::<Command>().unwrap(), Command::Empty);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_command_errors() {
        assert!(matches!("dance".parse::<Command>(), Err(FormError::UnknownCommand(_))));
        assert!(matches!("set rating".parse::<Command>(), Err(FormError::MissingValue(_))));
        assert!(matches!("rating=".parse::<Command>(), Err(FormError::MissingValue(_))));
        assert!(matches!(
            "colour=red".parse::<Command>(),
            Err(FormError::Feature(FeatureError::UnknownField(_)))
        ));
    }

    #[test]
    fn test_form_clamps_and_resets() {
        let mut form = InputForm::default();
        form.set(FormField::AverageUserRating, "9").unwrap();
        assert_eq!(form.values().average_user_rating, 5.0);
        assert!(form.set(FormField::TimeGapDays, "1.5").is_err());
        form.reset();
        assert_eq!(form.values(), &AppInputs::default());
    }

    #[test]
    fn test_reset_restores_starting_values() {
        let start = AppInputs::new(123_456_789, 820.0, 4.1, 15.0, 30);
        let mut form = InputForm::new(start.clone());
        form.set(FormField::SizeMb, "12").unwrap();
        form.set(FormField::IosVersion, "9").unwrap();
        assert_ne!(form.values(), &start);
        form.reset();
        assert_eq!(form.values(), &start);
    }
}
