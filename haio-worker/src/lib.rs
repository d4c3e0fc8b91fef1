//! The uniform `submit`/`is_done`/`take`/`ask_and_wait` worker contract,
//! plus the two narrow seam traits ([`Answerer`], [`Marketplace`]) a
//! caller implements to plug a real model provider or crowd marketplace
//! in behind it.

mod ai;
mod human;
mod normalize;
mod worker;

pub use ai::{Answerer, AiWorker};
pub use human::{HumanWorker, Marketplace, DEFAULT_POLL_INTERVAL};
pub use normalize::normalize_answer;
pub use worker::Worker;
