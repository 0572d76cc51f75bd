//! Typed input forms.
//!
//! Each form's `validate()` either returns the cleaned values or a
//! [`FieldErrors`] map. The map is the 400 body of the JSON API and is parsed
//! back by the page layer so it can show per-field messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const CAPTION_MAX_LEN: usize = 2200;
pub const COMMENT_MAX_LEN: usize = 1000;
pub const BIO_MAX_LEN: usize = 500;
pub const IMAGE_REF_MAX_LEN: usize = 500;
pub const AGE_MAX: i64 = 150;

pub const DEFAULT_PROFILE_PICTURE: &str = "default_profile_image";

/// Field name to messages, sorted by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// `Ok(value)` when no errors were recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    /// Read a 400 body back into field errors.
    ///
    /// Accepts message lists and bare strings; returns `None` when the body is
    /// not a field map (e.g. `{"detail": ...}`).
    pub fn from_json(body: &serde_json::Value) -> Option<FieldErrors> {
        let object = body.as_object()?;
        if object.contains_key("detail") {
            return None;
        }

        let mut errors = FieldErrors::new();
        for (field, value) in object {
            match value {
                serde_json::Value::String(message) => errors.add(field, message.clone()),
                serde_json::Value::Array(items) => {
                    for item in items {
                        if let Some(message) = item.as_str() {
                            errors.add(field, message);
                        }
                    }
                }
                _ => {}
            }
        }

        if errors.is_empty() { None } else { Some(errors) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                first = false;
                if field == NON_FIELD_ERRORS {
                    write!(f, "{}", message)?;
                } else {
                    write!(f, "{}: {}", field, message)?;
                }
            }
        }
        Ok(())
    }
}

/// Whether `username` could have been registered: 1 to 150 letters, digits
/// or `@ . + - _`.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= USERNAME_MAX_LEN
        && username.chars().all(is_username_char)
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

fn check_username(errors: &mut FieldErrors, username: &str) {
    if username.is_empty() {
        errors.add("username", "This field may not be blank.");
    } else if username.chars().count() > USERNAME_MAX_LEN {
        errors.add(
            "username",
            format!("Ensure this field has no more than {} characters.", USERNAME_MAX_LEN),
        );
    } else if !username.chars().all(is_username_char) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

fn check_max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max),
        );
    }
}

fn check_image_ref(errors: &mut FieldErrors, field: &str, value: &str) {
    check_max_len(errors, field, value, IMAGE_REF_MAX_LEN);
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<Registration, FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = self.username.trim();
        let email = self.email.trim();

        check_username(&mut errors, username);

        if email.is_empty() {
            errors.add("email", "This field may not be blank.");
        } else if !is_valid_email(email) {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password.is_empty() {
            errors.add("password", "This field may not be blank.");
        } else if self.password.chars().count() < PASSWORD_MIN_LEN {
            errors.add(
                "password",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    PASSWORD_MIN_LEN
                ),
            );
        }

        if self.password != self.password2 {
            errors.add(NON_FIELD_ERRORS, "Passwords do not match");
        }

        errors.into_result(Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    /// Only checks presence. Credentials are checked by the token endpoint.
    pub fn validate(&self) -> Result<(String, String), FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", "This field may not be blank.");
        }
        if self.password.is_empty() {
            errors.add("password", "This field may not be blank.");
        }
        errors.into_result((username.to_string(), self.password.clone()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPost {
    pub caption: String,
    pub image: Option<String>,
}

impl PostForm {
    pub fn validate(&self) -> Result<CleanPost, FieldErrors> {
        let mut errors = FieldErrors::new();
        let caption = self.caption.trim();

        if caption.is_empty() {
            errors.add("caption", "This field may not be blank.");
        }
        check_max_len(&mut errors, "caption", caption, CAPTION_MAX_LEN);

        let image = self
            .image
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(image) = image {
            check_image_ref(&mut errors, "image", image);
        }

        errors.into_result(CleanPost {
            caption: caption.to_string(),
            image: image.map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub content: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        let content = self.content.trim();

        if content.is_empty() {
            errors.add("content", "This field may not be blank.");
        }
        check_max_len(&mut errors, "content", content, COMMENT_MAX_LEN);

        errors.into_result(content.to_string())
    }
}

/// Present fields become `Some`, including an explicit `null`. Absent
/// fields fall back to `None` through `#[serde(default)]`.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Profile changes. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    /// `Some(None)` (a JSON `null`) clears the age.
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<Option<i64>>,
}

impl ProfileForm {
    /// Returns the form with text trimmed and an empty picture reset to the default.
    pub fn validate(&self) -> Result<ProfileForm, FieldErrors> {
        let mut errors = FieldErrors::new();

        let bio = self.bio.as_deref().map(str::trim);
        if let Some(bio) = bio {
            check_max_len(&mut errors, "bio", bio, BIO_MAX_LEN);
        }

        let picture = self.profile_picture.as_deref().map(|p| match p.trim() {
            "" => DEFAULT_PROFILE_PICTURE,
            trimmed => trimmed,
        });
        if let Some(picture) = picture {
            check_image_ref(&mut errors, "profile_picture", picture);
        }

        if self.age.flatten().is_some_and(|age| !(0..=AGE_MAX).contains(&age)) {
            errors.add(
                "age",
                format!("Ensure this value is between 0 and {}.", AGE_MAX),
            );
        }

        errors.into_result(ProfileForm {
            bio: bio.map(str::to_string),
            profile_picture: picture.map(str::to_string),
            age: self.age,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl PasswordChangeForm {
    /// Returns `(current, new)`. Whether `current` is correct is checked against the store.
    pub fn validate(&self) -> Result<(String, String), FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.current_password.is_empty() {
            errors.add("current_password", "This field may not be blank.");
        }
        if self.new_password.chars().count() < PASSWORD_MIN_LEN {
            errors.add(
                "new_password",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    PASSWORD_MIN_LEN
                ),
            );
        }
        if self.new_password != self.confirm_password {
            errors.add("confirm_password", "New passwords do not match.");
        }

        errors.into_result((self.current_password.clone(), self.new_password.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, email: &str, p1: &str, p2: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.into(),
            email: email.into(),
            password: p1.into(),
            password2: p2.into(),
        }
    }

    #[test]
    fn test_registration_valid() {
        let clean = registration(" alice ", "alice@example.com", "password1", "password1")
            .validate()
            .unwrap();
        assert_eq!(clean.username, "alice");
        assert_eq!(clean.email, "alice@example.com");
    }

    #[test]
    fn test_registration_password_mismatch() {
        let errors = registration("alice", "alice@example.com", "password1", "password2")
            .validate()
            .unwrap_err();
        assert_eq!(errors.get(NON_FIELD_ERRORS), ["Passwords do not match"]);
    }

    #[test]
    fn test_registration_field_rules() {
        let errors = registration("bad name!", "nope", "short", "short")
            .validate()
            .unwrap_err();
        assert_eq!(errors.get("username").len(), 1);
        assert_eq!(errors.get("email"), ["Enter a valid email address."]);
        assert_eq!(errors.get("password").len(), 1);
        assert!(errors.get(NON_FIELD_ERRORS).is_empty());

        let long = "a".repeat(USERNAME_MAX_LEN + 1);
        let errors = registration(&long, "a@b.co", "password1", "password1")
            .validate()
            .unwrap_err();
        assert_eq!(errors.get("username").len(), 1);
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@bco"));
        assert!(!is_valid_email("a@.co"));
        assert!(!is_valid_email("a@b."));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[test]
    fn test_post_form() {
        let clean = PostForm {
            caption: "  sunset  ".into(),
            image: Some("   ".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(
            clean,
            CleanPost {
                caption: "sunset".into(),
                image: None
            }
        );

        let errors = PostForm {
            caption: "   ".into(),
            image: Some("x".repeat(IMAGE_REF_MAX_LEN + 1)),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("caption").len(), 1);
        assert_eq!(errors.get("image").len(), 1);

        let errors = PostForm {
            caption: "x".repeat(CAPTION_MAX_LEN + 1),
            image: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("caption").len(), 1);
    }

    #[test]
    fn test_comment_form() {
        assert_eq!(
            CommentForm { content: " hi ".into() }.validate().unwrap(),
            "hi"
        );
        assert!(CommentForm { content: "".into() }.validate().is_err());
        assert!(
            CommentForm {
                content: "x".repeat(COMMENT_MAX_LEN + 1)
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn test_profile_form() {
        let clean = ProfileForm {
            bio: Some(" hello ".into()),
            profile_picture: Some("".into()),
            age: Some(Some(30)),
        }
        .validate()
        .unwrap();
        assert_eq!(clean.age, Some(Some(30)));
        assert_eq!(clean.bio.as_deref(), Some("hello"));
        assert_eq!(clean.profile_picture.as_deref(), Some(DEFAULT_PROFILE_PICTURE));

        let errors = ProfileForm {
            bio: Some("x".repeat(BIO_MAX_LEN + 1)),
            profile_picture: None,
            age: Some(Some(-1)),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("bio").len(), 1);
        assert_eq!(errors.get("age").len(), 1);

        assert!(ProfileForm { age: Some(Some(AGE_MAX + 1)), ..Default::default() }
            .validate()
            .is_err());

        let cleared = ProfileForm { age: Some(None), ..Default::default() };
        assert_eq!(cleared.validate().unwrap().age, Some(None));
    }

    #[test]
    fn test_profile_form_age_null_differs_from_absent() {
        let absent: ProfileForm = serde_json::from_str(r#"{"bio": "hi"}"#).unwrap();
        assert_eq!(absent.age, None);

        let null: ProfileForm = serde_json::from_str(r#"{"age": null}"#).unwrap();
        assert_eq!(null.age, Some(None));

        let set: ProfileForm = serde_json::from_str(r#"{"age": 41}"#).unwrap();
        assert_eq!(set.age, Some(Some(41)));

        // The page layer sends the clear as an explicit null
        assert_eq!(serde_json::to_value(&null).unwrap(), serde_json::json!({ "age": null }));
        assert_eq!(serde_json::to_value(&absent).unwrap(), serde_json::json!({ "bio": "hi" }));
    }

    #[test]
    fn test_password_change_form() {
        let ok = PasswordChangeForm {
            current_password: "oldpassword".into(),
            new_password: "newpassword".into(),
            confirm_password: "newpassword".into(),
        };
        assert_eq!(
            ok.validate().unwrap(),
            ("oldpassword".to_string(), "newpassword".to_string())
        );

        let errors = PasswordChangeForm {
            current_password: "oldpassword".into(),
            new_password: "newpassword".into(),
            confirm_password: "different1".into(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("confirm_password"), ["New passwords do not match."]);
    }

    #[test]
    fn test_field_errors_json_round_trip() {
        let mut errors = FieldErrors::new();
        errors.add("caption", "This field may not be blank.");
        errors.add(NON_FIELD_ERRORS, "Passwords do not match");

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["caption"][0], "This field may not be blank.");
        assert_eq!(FieldErrors::from_json(&json), Some(errors));
    }

    #[test]
    fn test_field_errors_from_other_bodies() {
        let detail = serde_json::json!({"detail": "Not found."});
        assert_eq!(FieldErrors::from_json(&detail), None);

        let bare = serde_json::json!({"age": "Bad age"});
        let errors = FieldErrors::from_json(&bare).unwrap();
        assert_eq!(errors.get("age"), ["Bad age"]);
        assert_eq!(errors.to_string(), "age: Bad age");
    }
}
