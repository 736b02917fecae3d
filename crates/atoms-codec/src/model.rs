//! # Typed Model
//!
//! One struct per variant of the current generation, and the [`Atom`] sum
//! over all of them. Values are produced only by the pipeline: the structs
//! are `#[non_exhaustive]`, and nothing here mutates a value after
//! construction.
//!
//! Serializing an atom yields its field-bag form: the `type` tag plus the
//! camelCase field names, with absent optionals omitted. Decoding that
//! output again yields an equal value.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use atoms_core::{AtomicClass, DecodeError};

use crate::decoder::Record;
use crate::expander::Resolved;

// ── Action status ───────────────────────────────────────────────────

/// Lifecycle state of an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActionStatus {
    ActiveActionStatus,
    CompletedActionStatus,
    FailedActionStatus,
    PotentialActionStatus,
}

/// A string that names no [`ActionStatus`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown action status: {0:?}")]
pub struct UnknownActionStatus(pub String);

impl ActionStatus {
    /// Every status, in ordinal order.
    pub fn all() -> &'static [ActionStatus] {
        &[
            Self::ActiveActionStatus,
            Self::CompletedActionStatus,
            Self::FailedActionStatus,
            Self::PotentialActionStatus,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActiveActionStatus => "ActiveActionStatus",
            Self::CompletedActionStatus => "CompletedActionStatus",
            Self::FailedActionStatus => "FailedActionStatus",
            Self::PotentialActionStatus => "PotentialActionStatus",
        }
    }

    /// The status legacy payloads encoded as the ordinal `n`.
    pub fn from_ordinal(n: usize) -> Option<Self> {
        Self::all().get(n).copied()
    }

    fn expected() -> String {
        Self::all()
            .iter()
            .map(ActionStatus::as_str)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = UnknownActionStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownActionStatus(s.to_string()))
    }
}

// ── Scalar variants ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct Text {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct Website {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct Email {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct Flag {
    pub flag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct Numeric {
    pub value: f64,
}

/// Inclusive numeric interval; `from_value <= to_value` is checked by the
/// validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct NumericRange {
    pub from_value: f64,
    pub to_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct MonetaryAmount {
    /// ISO 4217 alphabetic code.
    pub currency: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct DateTime {
    pub date_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct DateTimeRange {
    pub from_date_time: String,
    pub to_date_time: String,
}

// ── Agents ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct Person {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct Organization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Sub-units; always organizations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<Vec<Organization>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct Software {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Whoever performs, creates, or receives something.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Agent {
    Person(Person),
    Organization(Organization),
    Software(Software),
}

impl Agent {
    pub fn class(&self) -> AtomicClass {
        match self {
            Self::Person(_) => AtomicClass::Person,
            Self::Organization(_) => AtomicClass::Organization,
            Self::Software(_) => AtomicClass::Software,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Person(p) => &p.name,
            Self::Organization(o) => &o.name,
            Self::Software(s) => &s.name,
        }
    }
}

// ── Composite variants ──────────────────────────────────────────────

/// A categorized resource. Known as `Reference` in v1.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub category_lvl1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_lvl2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_lvl3: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_lvl4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct PostalAddress {
    pub address_country: String,
    pub address_locality: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_office_box_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub street_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct EducationalOccupationalCredential {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date_created: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognized_by: Option<Organization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct MediaObject {
    pub name: String,
    pub content_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
    /// Size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Agent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct DigitalDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<Agent>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_action: Option<Vec<Action>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated_media: Option<Vec<MediaObject>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct Action {
    pub action_status: ActionStatus,
    pub actor: Agent,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Why a failed action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant: Option<Vec<Agent>>,
    pub object: Resource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub struct EmailMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Agent>,
    pub to_recipient: Vec<Agent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc_recipient: Option<Vec<Agent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc_recipient: Option<Vec<Agent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_sent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_attachment: Option<Vec<MediaObject>>,
}

// ── Atom ────────────────────────────────────────────────────────────

/// A decoded value of any current-generation variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Atom {
    Text(Text),
    Website(Website),
    Email(Email),
    Flag(Flag),
    Numeric(Numeric),
    NumericRange(NumericRange),
    MonetaryAmount(MonetaryAmount),
    DateTime(DateTime),
    DateTimeRange(DateTimeRange),
    Person(Person),
    Organization(Organization),
    Software(Software),
    Resource(Resource),
    PostalAddress(PostalAddress),
    EducationalOccupationalCredential(EducationalOccupationalCredential),
    MediaObject(MediaObject),
    DigitalDocument(DigitalDocument),
    Action(Action),
    EmailMessage(EmailMessage),
}

impl Atom {
    pub fn class(&self) -> AtomicClass {
        match self {
            Self::Text(_) => AtomicClass::Text,
            Self::Website(_) => AtomicClass::Website,
            Self::Email(_) => AtomicClass::Email,
            Self::Flag(_) => AtomicClass::Flag,
            Self::Numeric(_) => AtomicClass::Numeric,
            Self::NumericRange(_) => AtomicClass::NumericRange,
            Self::MonetaryAmount(_) => AtomicClass::MonetaryAmount,
            Self::DateTime(_) => AtomicClass::DateTime,
            Self::DateTimeRange(_) => AtomicClass::DateTimeRange,
            Self::Person(_) => AtomicClass::Person,
            Self::Organization(_) => AtomicClass::Organization,
            Self::Software(_) => AtomicClass::Software,
            Self::Resource(_) => AtomicClass::Resource,
            Self::PostalAddress(_) => AtomicClass::PostalAddress,
            Self::EducationalOccupationalCredential(_) => {
                AtomicClass::EducationalOccupationalCredential
            }
            Self::MediaObject(_) => AtomicClass::MediaObject,
            Self::DigitalDocument(_) => AtomicClass::DigitalDocument,
            Self::Action(_) => AtomicClass::Action,
            Self::EmailMessage(_) => AtomicClass::EmailMessage,
        }
    }

    /// The field-bag form of this value.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Assemble a typed value from a fully resolved record.
    ///
    /// # Errors
    ///
    /// A record the decoder produced for a current-generation shape always
    /// converts. Hand-built records may fail with
    /// [`DecodeError::MissingField`] or [`DecodeError::TypeMismatch`];
    /// a legacy-only class fails with [`DecodeError::UnknownVariant`].
    pub fn from_record(record: Record<Resolved>) -> Result<Atom, DecodeError> {
        let mut f = Fields::new(record);
        let atom = match f.class {
            AtomicClass::Text => Atom::Text(Text {
                text: f.string("text")?,
            }),
            AtomicClass::Website => Atom::Website(Website {
                url: f.string("url")?,
            }),
            AtomicClass::Email => Atom::Email(Email {
                email: f.string("email")?,
            }),
            AtomicClass::Flag => Atom::Flag(Flag {
                flag: f.bool("flag")?,
            }),
            AtomicClass::Numeric => Atom::Numeric(Numeric {
                value: f.number("value")?,
            }),
            AtomicClass::NumericRange => Atom::NumericRange(NumericRange {
                from_value: f.number("fromValue")?,
                to_value: f.number("toValue")?,
            }),
            AtomicClass::MonetaryAmount => Atom::MonetaryAmount(MonetaryAmount {
                currency: f.string("currency")?,
                value: f.number("value")?,
            }),
            AtomicClass::DateTime => Atom::DateTime(DateTime {
                date_time: f.string("dateTime")?,
            }),
            AtomicClass::DateTimeRange => Atom::DateTimeRange(DateTimeRange {
                from_date_time: f.string("fromDateTime")?,
                to_date_time: f.string("toDateTime")?,
            }),
            AtomicClass::Person => Atom::Person(Person {
                id: f.opt_string("id")?,
                name: f.string("name")?,
                nickname: f.opt_string("nickname")?,
                email: f.opt_string("email")?,
                job_title: f.opt_string("jobTitle")?,
                telephone: f.opt_string("telephone")?,
                given_name: f.opt_string("givenName")?,
            }),
            AtomicClass::Organization => Atom::Organization(Organization {
                id: f.opt_string("id")?,
                name: f.string("name")?,
                nickname: f.opt_string("nickname")?,
                email: f.opt_string("email")?,
                department: f.opt_atoms("department", "Organization")?,
            }),
            AtomicClass::Software => Atom::Software(Software {
                id: f.opt_string("id")?,
                name: f.string("name")?,
                nickname: f.opt_string("nickname")?,
                email: f.opt_string("email")?,
            }),
            AtomicClass::Resource => Atom::Resource(Resource {
                id: f.string("id")?,
                name: f.string("name")?,
                category_lvl1: f.string("categoryLvl1")?,
                category_lvl2: f.opt_string("categoryLvl2")?,
                category_lvl3: f.opt_string("categoryLvl3")?,
                category_lvl4: f.opt_string("categoryLvl4")?,
                source: f.opt_string("source")?,
            }),
            AtomicClass::PostalAddress => Atom::PostalAddress(PostalAddress {
                address_country: f.string("addressCountry")?,
                address_locality: f.string("addressLocality")?,
                address_region: f.opt_string("addressRegion")?,
                post_office_box_number: f.opt_string("postOfficeBoxNumber")?,
                postal_code: f.opt_string("postalCode")?,
                street_address: f.string("streetAddress")?,
            }),
            AtomicClass::EducationalOccupationalCredential => {
                Atom::EducationalOccupationalCredential(EducationalOccupationalCredential {
                    name: f.string("name")?,
                    alternate_name: f.opt_string("alternateName")?,
                    description: f.opt_string("description")?,
                    date_created: f.string("dateCreated")?,
                    expires: f.opt_string("expires")?,
                    recognized_by: f.opt_atom("recognizedBy", "Organization")?,
                    credential_category: f.opt_string("credentialCategory")?,
                })
            }
            AtomicClass::MediaObject => Atom::MediaObject(MediaObject {
                name: f.string("name")?,
                content_url: f.string("contentUrl")?,
                encoding_format: f.opt_string("encodingFormat")?,
                content_size: f.opt_number("contentSize")?,
                upload_date: f.opt_string("uploadDate")?,
                author: f.opt_atom("author", AGENT)?,
            }),
            AtomicClass::DigitalDocument => Atom::DigitalDocument(DigitalDocument {
                creator: f.opt_atom("creator", AGENT)?,
                name: f.string("name")?,
                description: f.opt_string("description")?,
                date_created: f.opt_string("dateCreated")?,
                date_modified: f.opt_string("dateModified")?,
                text: f.opt_string("text")?,
                keywords: f.opt_strings("keywords")?.unwrap_or_default(),
                potential_action: f.opt_atoms("potentialAction", "Action")?,
                associated_media: f.opt_atoms("associatedMedia", "MediaObject")?,
            }),
            AtomicClass::Action => Atom::Action(Action {
                action_status: f.action_status("actionStatus")?,
                actor: f.atom("actor", AGENT)?,
                name: f.string("name")?,
                description: f.opt_string("description")?,
                error: f.opt_string("error")?,
                start_time: f.opt_string("startTime")?,
                end_time: f.opt_string("endTime")?,
                participant: f.opt_atoms("participant", AGENT)?,
                object: f.atom("object", "Resource")?,
            }),
            AtomicClass::EmailMessage => Atom::EmailMessage(EmailMessage {
                sender: f.opt_atom("sender", AGENT)?,
                to_recipient: f.atoms("toRecipient", AGENT)?,
                cc_recipient: f.opt_atoms("ccRecipient", AGENT)?,
                bcc_recipient: f.opt_atoms("bccRecipient", AGENT)?,
                subject: f.opt_string("subject")?,
                text: f.opt_string("text")?,
                date_sent: f.opt_string("dateSent")?,
                message_attachment: f.opt_atoms("messageAttachment", "MediaObject")?,
            }),
            AtomicClass::Reference | AtomicClass::Number => {
                return Err(DecodeError::UnknownVariant {
                    tag: f.class.to_string(),
                    detail: "legacy variant without a current counterpart of that name"
                        .to_string(),
                })
            }
        };
        Ok(atom)
    }
}

const AGENT: &str = "Person | Organization | Software";

impl From<Agent> for Atom {
    fn from(agent: Agent) -> Self {
        match agent {
            Agent::Person(p) => Atom::Person(p),
            Agent::Organization(o) => Atom::Organization(o),
            Agent::Software(s) => Atom::Software(s),
        }
    }
}

impl TryFrom<Atom> for Agent {
    type Error = Atom;

    fn try_from(atom: Atom) -> Result<Self, Atom> {
        match atom {
            Atom::Person(p) => Ok(Agent::Person(p)),
            Atom::Organization(o) => Ok(Agent::Organization(o)),
            Atom::Software(s) => Ok(Agent::Software(s)),
            other => Err(other),
        }
    }
}

macro_rules! narrow {
    ($($variant:ident),* $(,)?) => {$(
        impl TryFrom<Atom> for $variant {
            type Error = Atom;

            fn try_from(atom: Atom) -> Result<Self, Atom> {
                match atom {
                    Atom::$variant(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }
    )*};
}

narrow!(Organization, Resource, MediaObject, Action);

// ── Record field extraction ─────────────────────────────────────────

struct Fields {
    class: AtomicClass,
    values: HashMap<&'static str, Resolved>,
}

impl Fields {
    fn new(record: Record<Resolved>) -> Self {
        Self {
            class: record.class,
            values: record.fields.into_iter().collect(),
        }
    }

    fn missing(&self, name: &str) -> DecodeError {
        DecodeError::MissingField {
            variant: self.class.to_string(),
            field: name.to_string(),
        }
    }

    fn mismatch(&self, name: &str, expected: &str, actual: String) -> DecodeError {
        DecodeError::TypeMismatch {
            variant: self.class.to_string(),
            field: name.to_string(),
            expected: expected.to_string(),
            actual,
        }
    }

    fn opt_string(&mut self, name: &str) -> Result<Option<String>, DecodeError> {
        match self.values.remove(name) {
            None => Ok(None),
            Some(Resolved::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.mismatch(name, "string", describe(&other))),
        }
    }

    fn string(&mut self, name: &str) -> Result<String, DecodeError> {
        self.opt_string(name)?.ok_or_else(|| self.missing(name))
    }

    fn opt_number(&mut self, name: &str) -> Result<Option<f64>, DecodeError> {
        match self.values.remove(name) {
            None => Ok(None),
            Some(Resolved::Number(n)) => Ok(Some(n)),
            Some(other) => Err(self.mismatch(name, "number", describe(&other))),
        }
    }

    fn number(&mut self, name: &str) -> Result<f64, DecodeError> {
        self.opt_number(name)?.ok_or_else(|| self.missing(name))
    }

    fn bool(&mut self, name: &str) -> Result<bool, DecodeError> {
        match self.values.remove(name) {
            None => Err(self.missing(name)),
            Some(Resolved::Bool(b)) => Ok(b),
            Some(other) => Err(self.mismatch(name, "boolean", describe(&other))),
        }
    }

    fn opt_strings(&mut self, name: &str) -> Result<Option<Vec<String>>, DecodeError> {
        match self.values.remove(name) {
            None => Ok(None),
            Some(Resolved::StringList(items)) => Ok(Some(items)),
            Some(other) => Err(self.mismatch(name, "list of strings", describe(&other))),
        }
    }

    fn action_status(&mut self, name: &str) -> Result<ActionStatus, DecodeError> {
        let raw = self.string(name)?;
        raw.parse()
            .map_err(|_| self.mismatch(name, &ActionStatus::expected(), format!("string {raw:?}")))
    }

    fn opt_atom<T>(&mut self, name: &str, expected: &str) -> Result<Option<T>, DecodeError>
    where
        T: TryFrom<Atom, Error = Atom>,
    {
        match self.values.remove(name) {
            None => Ok(None),
            Some(Resolved::Atom(atom)) => T::try_from(*atom)
                .map(Some)
                .map_err(|other| self.mismatch(name, expected, other.class().to_string())),
            Some(other) => Err(self.mismatch(name, expected, describe(&other))),
        }
    }

    fn atom<T>(&mut self, name: &str, expected: &str) -> Result<T, DecodeError>
    where
        T: TryFrom<Atom, Error = Atom>,
    {
        self.opt_atom(name, expected)?
            .ok_or_else(|| self.missing(name))
    }

    fn opt_atoms<T>(&mut self, name: &str, expected: &str) -> Result<Option<Vec<T>>, DecodeError>
    where
        T: TryFrom<Atom, Error = Atom>,
    {
        match self.values.remove(name) {
            None => Ok(None),
            Some(Resolved::Atoms(atoms)) => atoms
                .into_iter()
                .map(|atom| {
                    T::try_from(atom)
                        .map_err(|other| self.mismatch(name, expected, other.class().to_string()))
                })
                .collect::<Result<Vec<T>, _>>()
                .map(Some),
            Some(other) => Err(self.mismatch(name, expected, describe(&other))),
        }
    }

    fn atoms<T>(&mut self, name: &str, expected: &str) -> Result<Vec<T>, DecodeError>
    where
        T: TryFrom<Atom, Error = Atom>,
    {
        self.opt_atoms(name, expected)?
            .ok_or_else(|| self.missing(name))
    }
}

fn describe(value: &Resolved) -> String {
    match value {
        Resolved::String(s) => format!("string {s:?}"),
        Resolved::Number(n) => format!("number {n}"),
        Resolved::Bool(b) => format!("boolean {b}"),
        Resolved::StringList(items) => format!("list of {} string(s)", items.len()),
        Resolved::Atom(atom) => atom.class().to_string(),
        Resolved::Atoms(atoms) => format!("list of {} value(s)", atoms.len()),
    }
}
