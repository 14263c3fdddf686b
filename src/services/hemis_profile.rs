//! Mapping of the identity provider's userinfo payload onto local student
//! and group records.
//!
//! The provider is loose about scalar types (ids and GPA arrive as numbers
//! or strings, nested objects may be `null`), so every leaf is read as a
//! `serde_json::Value` and normalised here.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

const DEFAULT_BIRTH_DATE: &str = "2000-01-01";
const DEFAULT_LEVEL_CODE: &str = "1";
const DEFAULT_PAYMENT_FORM: &str = "contract";
const DEFAULT_STUDENT_STATUS: &str = "active";
const DEFAULT_AVG_GPA: &str = "0";
const UNKNOWN_GROUP_CODE: &str = "Unknown";
const UNKNOWN_GROUP_NAME: &str = "Unknown Group";

#[derive(Debug, Error)]
pub(crate) enum ProfileError {
    #[error("profile payload is malformed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("profile has no student id number")]
    MissingStudentIdNumber,
}

/// Student fields as stored in `students`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StudentProfile {
    pub(crate) student_id_number: String,
    pub(crate) hemis_user_id: Option<String>,
    pub(crate) full_name: Option<String>,
    pub(crate) phone_number: Option<String>,
    pub(crate) image_url: Option<String>,
    pub(crate) email: String,
    pub(crate) passport_number: String,
    pub(crate) birth_date: String,
    pub(crate) student_status: String,
    pub(crate) payment_form: String,
    pub(crate) faculty: String,
    pub(crate) level: String,
    pub(crate) avg_gpa: String,
    pub(crate) education_type: String,
    pub(crate) gender: String,
    pub(crate) semester: String,
}

/// Group fields used only when the group code is seen for the first time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GroupProfile {
    pub(crate) group_code: String,
    pub(crate) group_name: String,
    pub(crate) faculty: String,
    pub(crate) level: String,
    pub(crate) education_year: String,
    pub(crate) education_form: String,
    pub(crate) education_lang: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HemisProfile {
    pub(crate) student: StudentProfile,
    pub(crate) group: Option<GroupProfile>,
}

#[derive(Debug, Default, Deserialize)]
struct UserInfo {
    #[serde(default)]
    student_id_number: Option<Value>,
    #[serde(default)]
    passport_number: Option<Value>,
    #[serde(default)]
    data: Option<ProfileData>,
    #[serde(default)]
    groups: Option<Vec<GroupData>>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileData {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    student_id_number: Option<Value>,
    #[serde(default)]
    full_name: Option<Value>,
    #[serde(default)]
    email: Option<Value>,
    #[serde(default)]
    phone: Option<Value>,
    #[serde(default)]
    image: Option<Value>,
    #[serde(default)]
    passport_number: Option<Value>,
    #[serde(default)]
    birth_date: Option<Value>,
    #[serde(default)]
    avg_gpa: Option<Value>,
    #[serde(default)]
    faculty: Option<NamedRef>,
    #[serde(default)]
    level: Option<NamedRef>,
    #[serde(default)]
    gender: Option<NamedRef>,
    #[serde(default)]
    semester: Option<Semester>,
    #[serde(default, rename = "paymentForm")]
    payment_form: Option<NamedRef>,
    #[serde(default, rename = "studentStatus")]
    student_status: Option<NamedRef>,
    #[serde(default, rename = "educationType")]
    education_type: Option<NamedRef>,
    #[serde(default)]
    group: Option<GroupData>,
}

#[derive(Debug, Default, Deserialize)]
struct NamedRef {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    name: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Semester {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    education_year: Option<NamedRef>,
}

#[derive(Debug, Default, Deserialize)]
struct GroupData {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    education_form: Option<NamedRef>,
    #[serde(default)]
    education_lang: Option<NamedRef>,
    #[serde(default)]
    education_type: Option<NamedRef>,
}

pub(crate) fn parse_profile(payload: Value) -> Result<HemisProfile, ProfileError> {
    let info: UserInfo = serde_json::from_value(payload)?;
    let data = info.data.unwrap_or_default();
    let groups = info.groups.unwrap_or_default();
    let first_group = if groups.is_empty() { data.group.as_ref() } else { groups.first() };

    let student_id_number = scalar(&info.student_id_number)
        .or_else(|| scalar(&data.student_id_number))
        .ok_or(ProfileError::MissingStudentIdNumber)?;

    let education_type = first_group
        .and_then(|group| name_of(&group.education_type))
        .or_else(|| name_of(&data.education_type))
        .unwrap_or_default();

    let group = first_group.map(|group| GroupProfile {
        group_code: scalar(&group.id).unwrap_or_else(|| UNKNOWN_GROUP_CODE.to_string()),
        group_name: scalar(&group.name).unwrap_or_else(|| UNKNOWN_GROUP_NAME.to_string()),
        faculty: name_of(&data.faculty).unwrap_or_default(),
        level: name_of(&data.level).unwrap_or_default(),
        education_year: data
            .semester
            .as_ref()
            .and_then(|semester| name_of(&semester.education_year))
            .unwrap_or_default(),
        education_form: name_of(&group.education_form).unwrap_or_default(),
        education_lang: name_of(&group.education_lang).unwrap_or_default(),
    });

    let student = StudentProfile {
        student_id_number,
        hemis_user_id: scalar(&data.id),
        full_name: scalar(&data.full_name),
        phone_number: scalar(&data.phone),
        image_url: scalar(&data.image),
        email: scalar(&data.email).unwrap_or_default(),
        passport_number: scalar(&info.passport_number)
            .or_else(|| scalar(&data.passport_number))
            .unwrap_or_default(),
        birth_date: scalar(&data.birth_date).unwrap_or_else(|| DEFAULT_BIRTH_DATE.to_string()),
        student_status: name_of(&data.student_status)
            .unwrap_or_else(|| DEFAULT_STUDENT_STATUS.to_string()),
        payment_form: name_of(&data.payment_form)
            .unwrap_or_else(|| DEFAULT_PAYMENT_FORM.to_string()),
        faculty: name_of(&data.faculty).unwrap_or_default(),
        level: data
            .level
            .as_ref()
            .and_then(|level| scalar(&level.code))
            .unwrap_or_else(|| DEFAULT_LEVEL_CODE.to_string()),
        avg_gpa: scalar(&data.avg_gpa).unwrap_or_else(|| DEFAULT_AVG_GPA.to_string()),
        education_type,
        gender: name_of(&data.gender).unwrap_or_default(),
        semester: data
            .semester
            .as_ref()
            .and_then(|semester| scalar(&semester.name))
            .unwrap_or_default(),
    };

    Ok(HemisProfile { student, group })
}

fn name_of(value: &Option<NamedRef>) -> Option<String> {
    value.as_ref().and_then(|named| scalar(&named.name))
}

/// Stringifies a JSON leaf; `null`, objects, arrays and blank strings are
/// treated as absent.
fn scalar(value: &Option<Value>) -> Option<String> {
    match value.as_ref()? {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
