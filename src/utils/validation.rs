use validator::{Validate, ValidationErrors};

use crate::errors::FieldErrors;

/// Runs the derived validators and folds their messages into `errors`.
/// Fields that already carry an error keep only that one.
pub fn validate_payload<T: Validate>(payload: &T, errors: &mut FieldErrors) {
    if let Err(err) = payload.validate() {
        merge_validation_errors(&err, errors);
    }
}

fn merge_validation_errors(err: &ValidationErrors, errors: &mut FieldErrors) {
    let mut fields: Vec<_> = err.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    for (field, field_errors) in fields {
        if errors.has(field) {
            continue;
        }
        for error in field_errors {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value ({}).", error.code));
            errors.add(field, message);
        }
    }
}
