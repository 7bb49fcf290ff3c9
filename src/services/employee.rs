use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use url::Url;
use validator::Validate;

use crate::db::EmployeeStore;
use crate::errors::{AppError, FieldErrors, BLANK, NULL, REQUIRED};
use crate::filters::employee::{EmployeeFilter, EmployeeFilterParams};
use crate::models::employee::{normalize_name, Employee, EmployeeChanges, Gender};
use crate::utils::pagination::{PageRequest, PaginatedResponse};
use crate::utils::validation::validate_payload;

pub const DATE_FORMAT_ERROR: &str =
    "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

/// Whether absent required fields are an error (create, PUT) or mean
/// "leave unchanged" (PATCH).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Full,
    Partial,
}

/// Raw employee fields from a request body. The outer `Option` records
/// whether a field was supplied at all, the inner one an explicit `null`.
#[derive(Debug, Default, Deserialize)]
pub struct EmployeePayload {
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub department: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub birthdate: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub hire_date: Option<Option<String>>,
}

/// The supplied, non-null text fields after trimming and normalization.
#[derive(Validate)]
struct EmployeeFields {
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    name: Option<String>,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 100, message = "Ensure this field has no more than 100 characters.")
    )]
    email: Option<String>,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    department: Option<String>,
    #[validate(custom = "validate_gender")]
    gender: Option<String>,
}

fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Absent is an error only for full writes; `null` is always one.
fn supplied(
    field: &str,
    value: Option<Option<String>>,
    mode: WriteMode,
    errors: &mut FieldErrors,
) -> Option<String> {
    match value {
        None => {
            if mode == WriteMode::Full {
                errors.add(field, REQUIRED);
            }
            None
        }
        Some(None) => {
            errors.add(field, NULL);
            None
        }
        Some(Some(value)) => Some(value),
    }
}

/// A required text field: supplied, non-null and non-blank once trimmed.
fn text_field(
    field: &str,
    value: Option<Option<String>>,
    mode: WriteMode,
    errors: &mut FieldErrors,
) -> Option<String> {
    let value = supplied(field, value, mode, errors)?.trim().to_string();
    if value.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    Some(value)
}

fn validate_gender(gender: &str) -> Result<(), validator::ValidationError> {
    Gender::parse(gender).map(|_| ()).map_err(|err| {
        let mut error = validator::ValidationError::new("invalid_choice");
        error.message = Some(err.to_string().into());
        error
    })
}

fn parse_body_date(
    field: &str,
    value: Option<Option<String>>,
    errors: &mut FieldErrors,
) -> Option<Option<NaiveDate>> {
    match value {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) if raw.trim().is_empty() => Some(None),
        Some(Some(raw)) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => Some(Some(date)),
            Err(_) => {
                errors.add(field, DATE_FORMAT_ERROR);
                None
            }
        },
    }
}

impl EmployeePayload {
    /// The explicit validation pass. On success the changes are ready for the
    /// store, with the name already normalized.
    pub fn into_changes(self, mode: WriteMode) -> Result<EmployeeChanges, AppError> {
        let mut errors = FieldErrors::new();

        let fields = EmployeeFields {
            // Length limits apply to the stored, normalized form.
            name: text_field("name", self.name, mode, &mut errors).map(|name| normalize_name(&name)),
            email: text_field("email", self.email, mode, &mut errors),
            department: text_field("department", self.department, mode, &mut errors),
            gender: supplied("gender", self.gender, mode, &mut errors),
        };

        validate_payload(&fields, &mut errors);

        let birthdate = parse_body_date("birthdate", self.birthdate, &mut errors);
        let hire_date = parse_body_date("hire_date", self.hire_date, &mut errors);

        errors.into_result()?;

        Ok(EmployeeChanges {
            name: fields.name,
            email: fields.email,
            department: fields.department,
            gender: fields.gender.and_then(|g| Gender::parse(&g).ok()),
            birthdate,
            hire_date,
        })
    }
}

/// List/create/read/update/delete over an injected store.
#[derive(Clone)]
pub struct EmployeeService {
    store: Arc<dyn EmployeeStore>,
}

impl EmployeeService {
    pub fn new(store: Arc<dyn EmployeeStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        params: &EmployeeFilterParams,
        page: PageRequest,
        url: &Url,
    ) -> Result<PaginatedResponse<Employee>, AppError> {
        let filter = EmployeeFilter::build(params)?;
        debug!("Listing employees with {:?} ({:?})", filter, page);
        let listing = self.store.list(&filter, page.window()).await?;
        page.paginate(listing, url)
    }

    pub async fn create(&self, payload: EmployeePayload) -> Result<Employee, AppError> {
        let new_employee = payload
            .into_changes(WriteMode::Full)?
            .into_new_employee()
            .ok_or_else(|| {
                AppError::InternalServerError("validated employee is missing fields".to_string())
            })?;
        let employee = self.store.create(new_employee).await?;
        debug!("Created employee {} ({})", employee.id, employee);
        Ok(employee)
    }

    pub async fn retrieve(&self, id: i64) -> Result<Employee, AppError> {
        Ok(self.store.get(id).await?)
    }

    /// PATCH when `mode` is `Partial`, PUT when `Full`.
    pub async fn update(
        &self,
        id: i64,
        payload: EmployeePayload,
        mode: WriteMode,
    ) -> Result<Employee, AppError> {
        // Unknown ids are reported before validation errors.
        self.store.get(id).await?;
        let changes = payload.into_changes(mode)?;
        let employee = self.store.update(id, changes).await?;
        info!("Updated employee {}", employee.id);
        Ok(employee)
    }

    pub async fn destroy(&self, id: i64) -> Result<(), AppError> {
        self.store.delete(id).await?;
        debug!("Deleted employee {}", id);
        Ok(())
    }
}
