// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tally-core: data model for the tally live-state sync engine.
//!
//! This crate provides the topic state types, payload validation, the
//! incremental merge rules and the push protocol shared by the sync engine
//! and its front-ends.

pub mod collection;
pub mod error;
pub mod merge;
pub mod protocol;
pub mod record;
pub mod session;
pub mod state;
pub mod topic;

pub use collection::{Collection, Upsert, DEFAULT_MAX_ITEMS};
pub use error::{Error, Result};
pub use merge::{Applied, Merge};
pub use protocol::{FrameKind, PushMessage, PushRequest};
pub use record::Record;
pub use rust_decimal::Decimal;
pub use session::{SessionEvent, UserId};
pub use state::{TopicData, TopicState};
pub use topic::TopicKind;
