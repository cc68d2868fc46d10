use crate::{
    data::people::NewStudent,
    error::{EmptyFieldSnafu, InvalidEmailSnafu, InvalidPhoneSnafu, JiEduResult},
};
use email_address::EmailAddress;
use serde::Deserialize;
use snafu::{ResultExt, ensure};
use std::str::FromStr;

/// Normalises a Kenyan mobile number to `07xxxxxxxx`/`01xxxxxxxx` form.
pub fn normalise_phone(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    let local = if let Some(rest) = compact.strip_prefix("+254") {
        rest.to_string()
    } else if let Some(rest) = compact.strip_prefix('0') {
        rest.to_string()
    } else {
        return None;
    };

    let valid = local.len() == 9
        && matches!(local.as_bytes()[0], b'7' | b'1')
        && local.bytes().all(|b| b.is_ascii_digit());
    valid.then(|| format!("0{local}"))
}

#[derive(Debug, Deserialize)]
pub struct NewStudentForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub course: i64,
}

impl NewStudentForm {
    pub fn validate(self) -> JiEduResult<NewStudent> {
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        ensure!(!first_name.is_empty(), EmptyFieldSnafu { field: "First name" });
        ensure!(!last_name.is_empty(), EmptyFieldSnafu { field: "Last name" });

        let email = self.email.trim();
        let email = EmailAddress::from_str(email).context(InvalidEmailSnafu { email })?;
        let phone = normalise_phone(&self.phone).ok_or_else(|| {
            InvalidPhoneSnafu {
                phone: self.phone.clone(),
            }
            .build()
        })?;

        Ok(NewStudent {
            first_name,
            last_name,
            email: email.to_string(),
            phone,
            course: self.course,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JiEduError;

    fn form(email: &str, phone: &str) -> NewStudentForm {
        NewStudentForm {
            first_name: " Njeri ".into(),
            last_name: "Mwangi".into(),
            email: email.into(),
            phone: phone.into(),
            course: 4,
        }
    }

    #[test]
    fn phone_numbers_normalise() {
        assert_eq!(normalise_phone("0712 345 678").as_deref(), Some("0712345678"));
        assert_eq!(normalise_phone("+254112345678").as_deref(), Some("0112345678"));
        assert_eq!(normalise_phone("0812345678"), None);
        assert_eq!(normalise_phone("071234567"), None);
        assert_eq!(normalise_phone("712345678"), None);
        assert_eq!(normalise_phone("07123456ab"), None);
    }

    #[test]
    fn valid_forms_are_trimmed() {
        let student = form("njeri@example.ac.ke", "+254 712 345 678").validate().unwrap();

        assert_eq!(student.first_name, "Njeri");
        assert_eq!(student.phone, "0712345678");
    }

    #[test]
    fn bad_fields_are_reported() {
        assert!(matches!(
            form("not-an-email", "0712345678").validate(),
            Err(JiEduError::InvalidEmail { .. })
        ));
        assert!(matches!(
            form("njeri@example.ac.ke", "12345").validate(),
            Err(JiEduError::InvalidPhone { .. })
        ));

        let mut blank = form("njeri@example.ac.ke", "0712345678");
        blank.last_name = "  ".into();
        assert!(matches!(blank.validate(), Err(JiEduError::EmptyField { field: "Last name" })));
    }
}
