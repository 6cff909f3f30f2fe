// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Test locales for games localized with gettext catalogs.
//!
//! Two locales are generated from the catalogs exported by the editor:
//!
//! * the debug-ID locale, where every string is replaced by a short
//!   stable identifier such as `#0042`. Testers report the identifier
//!   they see on screen and translators find the string by it. The
//!   same catalog is sorted and annotated with comments, so it also
//!   serves as the source catalog for translators.
//! * the hash locale, where every string is wrapped in markers such as
//!   `# Continue ~`. Text without the markers was never localized, and
//!   cut off markers show text which does not fit.
//!
//! [`tasks::process_locales`] runs both for every localization target
//! in a [`Config`].

pub mod catalog;
pub mod config;
pub mod debug_id;
pub mod encoding;
mod error;
pub mod identity;
pub mod po;
pub mod pseudo;
pub mod rules;
pub mod sort;
pub mod stats;
pub mod tasks;
mod util;

pub use catalog::{Catalog, Entry, Occurrence};
pub use config::Config;
pub use error::{Error, Result, RuleKind};
pub use identity::{IdentityAssigner, Ledger};
