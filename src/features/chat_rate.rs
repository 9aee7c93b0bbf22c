use crate::chunking::{Reduction, WindowContext, WindowReducer};
use crate::error::ReduceError;
use crate::features::{columns_of, unique_users};
use crate::models::FeatureColumns;

pub const FAMILY: &str = "chat_rate";

pub const COLUMNS: &[&str] = &["chat_rate", "mean_chat_rate"];

/// Messages per `D` minutes, for the whole window and per chatter.
pub struct ChatRateReducer;

impl WindowReducer for ChatRateReducer {
    fn family(&self) -> &str {
        FAMILY
    }

    fn columns(&self) -> Vec<String> {
        columns_of(COLUMNS)
    }

    fn reduce(&self, ctx: &WindowContext<'_>) -> Result<Reduction, ReduceError> {
        let chat_rate = ctx.rate(ctx.events.len() as f64);
        // Mean of each chatter's own rate; rates share a denominator so
        // this is the window rate spread over its chatters.
        let chatters = unique_users(ctx.events);
        let mean_chat_rate = if chatters == 0 {
            0.0
        } else {
            chat_rate / chatters as f64
        };

        let mut row = FeatureColumns::new();
        row.insert("chat_rate".into(), chat_rate.into());
        row.insert("mean_chat_rate".into(), mean_chat_rate.into());
        Ok(Reduction::Row(row))
    }
}
