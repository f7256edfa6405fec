//! Preference eligibility rule.
//!
//! A notification may go out on channel C for topic T iff the user's
//! frequency is not `never`, they opted in to T, and C is enabled.

use crate::channels::Channel;
use crate::preference::PreferenceRecord;
use crate::topics::{Frequency, Topic};

/// Whether `record` permits delivering `topic` over `channel`.
pub fn is_eligible(record: &PreferenceRecord, topic: Topic, channel: Channel) -> bool {
    record.frequency != Frequency::Never && record.topics.get(topic) && record.channels.get(channel)
}

/// All channels eligible for `topic`, in canonical order.
pub fn eligible_channels(record: &PreferenceRecord, topic: Topic) -> Vec<Channel> {
    Channel::ALL
        .into_iter()
        .filter(|c| is_eligible(record, topic, *c))
        .collect()
}
