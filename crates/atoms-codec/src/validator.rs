//! # Validator
//!
//! Value-level checks that the shape alone cannot express. Unlike decoding,
//! validation is total: the whole tree is walked and every violation is
//! collected, each with the field path from the root.
//!
//! | Check | Code |
//! |---|---|
//! | `NumericRange.fromValue <= toValue` | `InvalidRange` |
//! | `DateTimeRange.fromDateTime <= toDateTime` | `InvalidRange` |
//! | `Action.startTime <= endTime` | `InvalidRange` |
//! | credential `dateCreated <= expires` | `InvalidRange` |
//! | timestamp fields match the profile | `MalformedTimestamp` |
//! | `MonetaryAmount.currency` is `[A-Z]{3}` | `InvalidCurrency` |
//! | `EmailMessage.toRecipient` non-empty | `MissingRecipient` |
//!
//! Timestamp ranges compare the strings lexicographically, and only when
//! both ends are well-formed; a malformed end is reported once, as
//! `MalformedTimestamp`.
//!
//! A failed action without an `error` is accepted with an advisory
//! [`Warning`].

use serde::{Deserialize, Serialize};

use atoms_core::{check_timestamp, AtomicClass, ErrorCode, Violation};

use crate::model::{
    Action, ActionStatus, Agent, Atom, DigitalDocument, EducationalOccupationalCredential,
    EmailMessage, MediaObject, Organization,
};

/// Advisory finding code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCode {
    /// An action marked failed carries no `error` explaining why.
    FailedActionWithoutError,
    /// A legacy action had no `object`; a placeholder resource was
    /// substituted.
    PlaceholderObject,
}

/// An advisory finding. Never causes rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: WarningCode,
    pub variant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub detail: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "[{:?}] {}.{}: {}", self.code, self.variant, field, self.detail),
            None => write!(f, "[{:?}] {}: {}", self.code, self.variant, self.detail),
        }
    }
}

/// Everything the validator found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub violations: Vec<Violation>,
    pub warnings: Vec<Warning>,
}

impl Report {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check `atom` and everything nested in it.
pub fn validate(atom: &Atom) -> Report {
    let mut checker = Checker::default();
    checker.atom(atom, "");
    Report {
        violations: checker.violations,
        warnings: checker.warnings,
    }
}

fn join(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn indexed(prefix: &str, field: &str, index: usize) -> String {
    format!("{}[{index}]", join(prefix, field))
}

#[derive(Default)]
struct Checker {
    violations: Vec<Violation>,
    warnings: Vec<Warning>,
}

impl Checker {
    fn report(&mut self, code: ErrorCode, variant: AtomicClass, path: String, detail: String) {
        self.violations.push(Violation {
            code,
            variant: variant.to_string(),
            field: Some(path),
            detail,
        });
    }

    fn atom(&mut self, atom: &Atom, prefix: &str) {
        match atom {
            Atom::NumericRange(range) => {
                if range.from_value > range.to_value {
                    self.report(
                        ErrorCode::InvalidRange,
                        AtomicClass::NumericRange,
                        join(prefix, "fromValue"),
                        format!(
                            "fromValue {} exceeds toValue {}",
                            range.from_value, range.to_value
                        ),
                    );
                }
            }
            Atom::MonetaryAmount(amount) => {
                let currency = &amount.currency;
                let valid = currency.len() == 3 && currency.bytes().all(|b| b.is_ascii_uppercase());
                if !valid {
                    self.report(
                        ErrorCode::InvalidCurrency,
                        AtomicClass::MonetaryAmount,
                        join(prefix, "currency"),
                        format!("{currency:?} is not a three-letter uppercase currency code"),
                    );
                }
            }
            Atom::DateTime(dt) => {
                self.timestamp(AtomicClass::DateTime, prefix, "dateTime", &dt.date_time);
            }
            Atom::DateTimeRange(range) => self.timestamp_range(
                AtomicClass::DateTimeRange,
                prefix,
                ("fromDateTime", Some(&range.from_date_time)),
                ("toDateTime", Some(&range.to_date_time)),
            ),
            Atom::Organization(org) => self.organization(org, prefix),
            Atom::EducationalOccupationalCredential(credential) => {
                self.credential(credential, prefix)
            }
            Atom::MediaObject(media) => self.media_object(media, prefix),
            Atom::DigitalDocument(doc) => self.digital_document(doc, prefix),
            Atom::Action(action) => self.action(action, prefix),
            Atom::EmailMessage(message) => self.email_message(message, prefix),
            Atom::Text(_)
            | Atom::Website(_)
            | Atom::Email(_)
            | Atom::Flag(_)
            | Atom::Numeric(_)
            | Atom::Person(_)
            | Atom::Software(_)
            | Atom::Resource(_)
            | Atom::PostalAddress(_) => {}
        }
    }

    fn agent(&mut self, agent: &Agent, prefix: &str) {
        if let Agent::Organization(org) = agent {
            self.organization(org, prefix);
        }
    }

    fn agents(&mut self, agents: Option<&Vec<Agent>>, prefix: &str, field: &str) {
        for (i, agent) in agents.into_iter().flatten().enumerate() {
            self.agent(agent, &indexed(prefix, field, i));
        }
    }

    fn organization(&mut self, org: &Organization, prefix: &str) {
        for (i, dept) in org.department.iter().flatten().enumerate() {
            self.organization(dept, &indexed(prefix, "department", i));
        }
    }

    fn credential(&mut self, credential: &EducationalOccupationalCredential, prefix: &str) {
        self.timestamp_range(
            AtomicClass::EducationalOccupationalCredential,
            prefix,
            ("dateCreated", Some(&credential.date_created)),
            ("expires", credential.expires.as_ref()),
        );
        if let Some(org) = &credential.recognized_by {
            self.organization(org, &join(prefix, "recognizedBy"));
        }
    }

    fn media_object(&mut self, media: &MediaObject, prefix: &str) {
        if let Some(date) = &media.upload_date {
            self.timestamp(AtomicClass::MediaObject, prefix, "uploadDate", date);
        }
        if let Some(author) = &media.author {
            self.agent(author, &join(prefix, "author"));
        }
    }

    fn digital_document(&mut self, doc: &DigitalDocument, prefix: &str) {
        let class = AtomicClass::DigitalDocument;
        if let Some(creator) = &doc.creator {
            self.agent(creator, &join(prefix, "creator"));
        }
        if let Some(date) = &doc.date_created {
            self.timestamp(class, prefix, "dateCreated", date);
        }
        if let Some(date) = &doc.date_modified {
            self.timestamp(class, prefix, "dateModified", date);
        }
        for (i, action) in doc.potential_action.iter().flatten().enumerate() {
            self.action(action, &indexed(prefix, "potentialAction", i));
        }
        for (i, media) in doc.associated_media.iter().flatten().enumerate() {
            self.media_object(media, &indexed(prefix, "associatedMedia", i));
        }
    }

    fn action(&mut self, action: &Action, prefix: &str) {
        self.timestamp_range(
            AtomicClass::Action,
            prefix,
            ("startTime", action.start_time.as_ref()),
            ("endTime", action.end_time.as_ref()),
        );
        if action.action_status == ActionStatus::FailedActionStatus && action.error.is_none() {
            self.warnings.push(Warning {
                code: WarningCode::FailedActionWithoutError,
                variant: AtomicClass::Action.to_string(),
                field: Some(join(prefix, "error")),
                detail: format!("action {:?} failed without an error description", action.name),
            });
        }
        self.agent(&action.actor, &join(prefix, "actor"));
        self.agents(action.participant.as_ref(), prefix, "participant");
    }

    fn email_message(&mut self, message: &EmailMessage, prefix: &str) {
        let class = AtomicClass::EmailMessage;
        if message.to_recipient.is_empty() {
            self.report(
                ErrorCode::MissingRecipient,
                class,
                join(prefix, "toRecipient"),
                "a message needs at least one recipient".to_string(),
            );
        }
        if let Some(date) = &message.date_sent {
            self.timestamp(class, prefix, "dateSent", date);
        }
        if let Some(sender) = &message.sender {
            self.agent(sender, &join(prefix, "sender"));
        }
        self.agents(Some(&message.to_recipient), prefix, "toRecipient");
        self.agents(message.cc_recipient.as_ref(), prefix, "ccRecipient");
        self.agents(message.bcc_recipient.as_ref(), prefix, "bccRecipient");
        for (i, media) in message.message_attachment.iter().flatten().enumerate() {
            self.media_object(media, &indexed(prefix, "messageAttachment", i));
        }
    }

    /// Report a malformed timestamp; returns whether it was well-formed.
    fn timestamp(&mut self, variant: AtomicClass, prefix: &str, field: &str, value: &str) -> bool {
        match check_timestamp(value) {
            Ok(()) => true,
            Err(err) => {
                self.report(
                    ErrorCode::MalformedTimestamp,
                    variant,
                    join(prefix, field),
                    err.to_string(),
                );
                false
            }
        }
    }

    fn timestamp_range(
        &mut self,
        variant: AtomicClass,
        prefix: &str,
        (from_field, from): (&str, Option<&String>),
        (to_field, to): (&str, Option<&String>),
    ) {
        let from_ok = from.map(|v| self.timestamp(variant, prefix, from_field, v));
        let to_ok = to.map(|v| self.timestamp(variant, prefix, to_field, v));
        if let (Some(true), Some(true), Some(from), Some(to)) = (from_ok, to_ok, from, to) {
            if from > to {
                self.report(
                    ErrorCode::InvalidRange,
                    variant,
                    join(prefix, from_field),
                    format!("{from_field} {from} is after {to_field} {to}"),
                );
            }
        }
    }
}
