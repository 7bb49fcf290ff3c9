use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use super::{parse_date_param, text_param};
use crate::errors::{AppError, FieldErrors};
use crate::models::employee::Employee;

/// Recognized list filters. Anything else on the query string is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct EmployeeFilterParams {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub birthdate_before: Option<String>,
    pub birthdate_after: Option<String>,
    pub hire_date: Option<String>,
    pub hire_date_before: Option<String>,
    pub hire_date_after: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DateFilter {
    #[default]
    Any,
    On(NaiveDate),
    /// Open interval; either bound may be missing.
    Between {
        before: Option<NaiveDate>,
        after: Option<NaiveDate>,
    },
}

impl DateFilter {
    /// An exact date wins over the range bounds for the same field.
    fn build(
        field: &str,
        exact: Option<&str>,
        before: Option<&str>,
        after: Option<&str>,
        errors: &mut FieldErrors,
    ) -> Self {
        if exact.map_or(false, |v| !v.trim().is_empty()) {
            return match parse_date_param(field, exact, errors) {
                Some(date) => DateFilter::On(date),
                None => DateFilter::Any,
            };
        }

        let before = parse_date_param(&format!("{}_before", field), before, errors);
        let after = parse_date_param(&format!("{}_after", field), after, errors);
        if before.is_none() && after.is_none() {
            DateFilter::Any
        } else {
            DateFilter::Between { before, after }
        }
    }

    pub fn matches(&self, value: Option<NaiveDate>) -> bool {
        match (self, value) {
            (DateFilter::Any, _) => true,
            (_, None) => false,
            (DateFilter::On(date), Some(value)) => value == *date,
            (DateFilter::Between { before, after }, Some(value)) => {
                before.map_or(true, |b| value < b) && after.map_or(true, |a| value > a)
            }
        }
    }

    fn push_sql<'a>(&self, column: &str, qb: &mut QueryBuilder<'a, Postgres>, has_where: &mut bool) {
        match self {
            DateFilter::Any => {}
            DateFilter::On(date) => {
                push_clause(qb, has_where);
                qb.push(format!("{} = ", column));
                qb.push_bind(*date);
            }
            DateFilter::Between { before, after } => {
                if let Some(before) = before {
                    push_clause(qb, has_where);
                    qb.push(format!("{} < ", column));
                    qb.push_bind(*before);
                }
                if let Some(after) = after {
                    push_clause(qb, has_where);
                    qb.push(format!("{} > ", column));
                    qb.push_bind(*after);
                }
            }
        }
    }
}

/// Conjunction of every supplied filter. Unsupplied filters match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub gender: Option<String>,
    pub birthdate: DateFilter,
    pub hire_date: DateFilter,
}

impl EmployeeFilter {
    pub fn build(params: &EmployeeFilterParams) -> Result<Self, AppError> {
        let mut errors = FieldErrors::new();

        let filter = EmployeeFilter {
            name: text_param(params.name.as_deref()),
            email: text_param(params.email.as_deref()),
            department: text_param(params.department.as_deref()),
            gender: text_param(params.gender.as_deref()),
            birthdate: DateFilter::build(
                "birthdate",
                params.birthdate.as_deref(),
                params.birthdate_before.as_deref(),
                params.birthdate_after.as_deref(),
                &mut errors,
            ),
            hire_date: DateFilter::build(
                "hire_date",
                params.hire_date.as_deref(),
                params.hire_date_before.as_deref(),
                params.hire_date_after.as_deref(),
                &mut errors,
            ),
        };

        errors.into_result()?;
        Ok(filter)
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        contains_ci(&employee.name, self.name.as_deref())
            && contains_ci(&employee.email, self.email.as_deref())
            && contains_ci(&employee.department, self.department.as_deref())
            && self
                .gender
                .as_deref()
                .map_or(true, |g| employee.gender.as_str() == g)
            && self.birthdate.matches(employee.birthdate)
            && self.hire_date.matches(employee.hire_date)
    }

    /// Appends the `WHERE` clause for this filter, if any, to `qb`.
    pub fn push_where<'a>(&self, qb: &mut QueryBuilder<'a, Postgres>) {
        let mut has_where = false;

        for (column, needle) in [
            ("name", &self.name),
            ("email", &self.email),
            ("department", &self.department),
        ] {
            if let Some(needle) = needle {
                push_clause(qb, &mut has_where);
                qb.push(format!("strpos(lower({}), lower(", column));
                qb.push_bind(needle.clone());
                qb.push(")) > 0");
            }
        }

        if let Some(gender) = &self.gender {
            push_clause(qb, &mut has_where);
            qb.push("gender = ");
            qb.push_bind(gender.clone());
        }

        self.birthdate.push_sql("birthdate", qb, &mut has_where);
        self.hire_date.push_sql("hire_date", qb, &mut has_where);
    }
}

fn push_clause(qb: &mut QueryBuilder<'_, Postgres>, has_where: &mut bool) {
    qb.push(if *has_where { " AND " } else { " WHERE " });
    *has_where = true;
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}
