use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    M,
    F,
}

#[derive(Debug, Error)]
#[error("\"{0}\" is not a valid choice.")]
pub struct InvalidGender(pub String);

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
        }
    }

    /// Exact, case-sensitive match on the stored code.
    pub fn parse(value: &str) -> Result<Self, InvalidGender> {
        match value {
            "M" => Ok(Gender::M),
            "F" => Ok(Gender::F),
            other => Err(InvalidGender(other.to_string())),
        }
    }
}

impl TryFrom<String> for Gender {
    type Error = InvalidGender;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Gender::parse(&value)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub department: String,
    #[sqlx(try_from = "String")]
    pub gender: Gender,
    pub birthdate: Option<NaiveDate>,
    pub hire_date: Option<NaiveDate>,
    #[serde(skip_serializing)]
    pub created: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated: DateTime<Utc>,
}

/// A validated, normalized record ready for insertion.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub department: String,
    pub gender: Gender,
    pub birthdate: Option<NaiveDate>,
    pub hire_date: Option<NaiveDate>,
}

/// Field changes for an update. `None` leaves a column untouched; the nested
/// `Option` on dates distinguishes "set to null" from "not supplied".
#[derive(Debug, Clone, Default)]
pub struct EmployeeChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub gender: Option<Gender>,
    pub birthdate: Option<Option<NaiveDate>>,
    pub hire_date: Option<Option<NaiveDate>>,
}

impl EmployeeChanges {
    /// `None` unless every required field is present.
    pub fn into_new_employee(self) -> Option<NewEmployee> {
        Some(NewEmployee {
            name: self.name?,
            email: self.email?,
            department: self.department?,
            gender: self.gender?,
            birthdate: self.birthdate.flatten(),
            hire_date: self.hire_date.flatten(),
        })
    }

    pub fn apply_to(self, employee: &mut Employee) {
        if let Some(name) = self.name {
            employee.name = name;
        }
        if let Some(email) = self.email {
            employee.email = email;
        }
        if let Some(department) = self.department {
            employee.department = department;
        }
        if let Some(gender) = self.gender {
            employee.gender = gender;
        }
        if let Some(birthdate) = self.birthdate {
            employee.birthdate = birthdate;
        }
        if let Some(hire_date) = self.hire_date {
            employee.hire_date = hire_date;
        }
    }
}

impl fmt::Display for Employee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.name, self.department)
    }
}

/// Title-cases a name: letters following another letter are lowercased, every
/// other letter starts a word and is uppercased.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_word = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_name_title_cases_words() {
        assert_eq!(normalize_name("john doe"), "John Doe");
        assert_eq!(normalize_name("JANE DOE"), "Jane Doe");
        assert_eq!(normalize_name("o'neil smith"), "O'Neil Smith");
        assert_eq!(normalize_name("JOHN-PAUL"), "John-Paul");
        assert_eq!(normalize_name("agent 007bond"), "Agent 007Bond");
        assert_eq!(normalize_name("émile zola"), "Émile Zola");
    }

    #[test]
    fn normalize_name_is_idempotent() {
        let once = normalize_name("richard ROE");
        assert_eq!(normalize_name(&once), once);
    }

    #[test]
    fn gender_parsing_is_case_sensitive() {
        assert_eq!(Gender::parse("M").unwrap(), Gender::M);
        assert_eq!(Gender::parse("F").unwrap(), Gender::F);
        let err = Gender::parse("m").unwrap_err();
        assert_eq!(err.to_string(), "\"m\" is not a valid choice.");
    }

    #[test]
    fn serialized_shape_omits_timestamps() {
        let employee = Employee {
            id: 7,
            name: "John Doe".to_string(),
            email: "john.doe@luizalabs.com".to_string(),
            department: "Development".to_string(),
            gender: Gender::M,
            birthdate: NaiveDate::from_ymd_opt(1989, 5, 24),
            hire_date: None,
            created: Utc::now(),
            updated: Utc::now(),
        };
        let json = serde_json::to_value(&employee).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "name": "John Doe",
                "email": "john.doe@luizalabs.com",
                "department": "Development",
                "gender": "M",
                "birthdate": "1989-05-24",
                "hire_date": null,
            })
        );
        assert_eq!(employee.to_string(), "John Doe at Development");
    }
}
