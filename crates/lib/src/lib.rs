//! Core library for the onboarding-forms service.
//!
//! Everything here is transport-agnostic: form and field definitions,
//! conditional-visibility evaluation, answer validation, submission intake
//! with document attachments, and the notification hand-off. The HTTP
//! surface lives in the server crate and only composes these pieces.
//!
//! # Layout
//!
//! - [`provider`]: the SQLite handle and schema bootstrap.
//! - [`store`]: [`store::FormStore`] and [`store::SubmissionStore`], the two
//!   persistence facades.
//! - [`conditional`] and [`validation`]: the pure evaluation pass run on
//!   every submission.
//! - [`files`] and [`notify`]: the two external collaborators, behind
//!   traits so tests can substitute them.

pub mod conditional;
pub mod errors;
pub mod files;
pub mod notify;
pub mod provider;
pub mod store;
pub mod types;
pub mod validation;

pub use errors::{StoreError, ValidationErrors};
pub use provider::SqliteProvider;
pub use store::{FormStore, SubmissionStore};
pub use types::{
    AnswerMap, ConditionalOperator, Document, Field, FieldPatch, FieldSpec, FieldType, Form,
    FormPatch, NewForm, Submission, SubmissionStatus, Submitter, UploadedFile,
};
