//! # Messages
//!
//! Contains constant strings and format functions for user-facing messages.
//! Replies are Markdown; the Matrix adapter renders them.

// General
pub const AUTH_DENIED: &str = "🚫 **Authorization Denied**.";

pub fn plural(count: u64, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

// count
pub fn count_channel(count: u64) -> String {
    format!("**This Channel**: **{}**", plural(count, "nice"))
}

pub fn count_server(count: u64) -> String {
    format!("**This Server**: **{}**", plural(count, "nice"))
}

pub const COUNT_TITLE: &str = "📊 **Nice Statistics**";
pub const COUNT_BREAKDOWN_TITLE: &str = "**Channel Breakdown**";

// friday
pub const FRIDAY_VIDEO_URL: &str = "https://www.youtube.com/watch?v=kfVsfOSbJY0";

pub fn friday_celebration() -> String {
    format!(
        "🎉 **It's Friday, Friday!** 🎉\nGotta get down on Friday! 🎵\n\n{FRIDAY_VIDEO_URL}\n\nEverybody's lookin' forward to the weekend! 🎊"
    )
}

pub const FRIDAY_ALREADY_USED: &str = "⏸️ Hold up! This channel already got its Friday fix today!\nCome back next Friday for more fun, fun, fun, fun! 😄";

pub fn friday_not_yet(day_name: &str, days_until: u32) -> String {
    if days_until == 1 {
        format!("❌ It's not Friday yet! Today is {day_name}.\nTomorrow is Friday! Check back then! 🗓️")
    } else {
        format!(
            "❌ It's not Friday yet! Today is {day_name}.\nCome back in {days_until} days when the weekend arrives! 🗓️"
        )
    }
}

// stock
pub const STOCK_USAGE: &str = "❌ Please provide a ticker symbol. Example: `!stock AAPL`";
pub const STOCK_BAD_LENGTH: &str = "❌ Ticker symbol must be 1-10 characters";
pub const STOCK_BAD_CHARS: &str =
    "❌ Ticker symbol can only contain letters, numbers, hyphens, and periods";

pub fn stock_fetching(ticker: &str) -> String {
    format!("🔍 Fetching stock data for **{ticker}**...")
}

pub fn stock_error(err: &str) -> String {
    format!("❌ {err}")
}

pub const STOCK_FOOTER_LIVE: &str = "_Powered by Yahoo Finance • Data may be delayed_";
pub const STOCK_FOOTER_CACHED: &str = "_Powered by Yahoo Finance • Cached data_";

// chatgpt
pub const CHAT_USAGE: &str =
    "Please provide a prompt. Example: `!chat What is the capital of France?`";
pub const CHAT_DISABLED: &str =
    "❌ OpenAI API key not configured. Please add `openai_api_key` to your config.yaml";
pub const CHAT_EMPTY_RESPONSE: &str = "❌ Received empty response from ChatGPT.";
pub const CHAT_RESET: &str = "🧹 Your conversation history has been cleared.";
pub const CHAT_NOTHING_TO_RESET: &str = "You don't have any conversation history yet.";
pub const CHAT_NO_HISTORY: &str =
    "You don't have any conversation history yet. Start one with `!chat <prompt>`.";
pub const CHAT_RATE_LIMITED: &str = "❌ **Rate Limit Exceeded**\n\nYou've hit the OpenAI API rate limit. Please wait a moment before trying again.";

pub fn chat_thinking(prompt: &str) -> String {
    format!("🤖 Asking ChatGPT: **{}**", truncate(prompt, 100))
}

pub fn chat_response(response: &str, model: &str) -> String {
    format!(
        "🤖 **ChatGPT Response**\n\n{}\n\n_Powered by OpenAI {model}_",
        truncate(response, 1900)
    )
}

pub fn chat_quota_exceeded(err: &str) -> String {
    format!(
        "❌ **API Quota Exceeded**\n\nYour OpenAI account has exceeded its quota. Check usage and billing at https://platform.openai.com/usage\n\n**Error Details:** `{}`",
        truncate(err, 200)
    )
}

pub fn chat_invalid_key(err: &str) -> String {
    format!(
        "❌ **Invalid API Key Error**\n\nThe OpenAI API rejected your key. Check it at https://platform.openai.com/api-keys\n\n**Error:** `{}`",
        truncate(err, 250)
    )
}

pub fn chat_failed(err: &str) -> String {
    format!(
        "❌ **Error communicating with ChatGPT**\n\n**Details:** ```{}```\n\nCheck the bot log for full error details.",
        truncate(err, 1800)
    )
}

pub fn chat_history_stats(exchanges: usize, max_pairs: usize, last: &str) -> String {
    format!(
        "📜 **Conversation History**\n\nExchanges remembered: **{exchanges}** / {max_pairs}\nLast message: {last}\n\nUse `!chat reset` to start over."
    )
}

// weather
pub const WEATHER_NEED_LOCATION: &str =
    "Please provide a zip code or save your location with `!setlocation <zipcode>`";
pub const WEATHER_BAD_ZIP: &str = "Please provide a valid 5-digit US zip code";
pub const WEATHER_DISABLED: &str =
    "Weather API key not configured. Please add `weather_api_key` to config.yaml";
pub const SETLOCATION_USAGE: &str = "Usage: `!setlocation <zipcode>`";

pub fn weather_error(err: &str) -> String {
    format!("Error: {err}")
}

pub fn location_unverified(err: &str) -> String {
    format!("Unable to verify zip code: {err}")
}

pub fn location_saved(location: &str, zip: &str) -> String {
    format!(
        "Your location has been saved as {location} ({zip}). Use `!weather` without a zip code to get weather for your saved location."
    )
}

// quote
pub const QUOTES_EMPTY: &str =
    "❌ No quotes available. Add some quotes to the `quotes.json` file in the data directory!";

pub fn quote_not_found_id(id: u64) -> String {
    format!("❌ No quote found with ID: **{id}**\nTry `!quote` for a random quote.")
}

pub fn quote_not_found_text(term: &str) -> String {
    format!("❌ No quotes found matching: **{term}**\nTry `!quote` for a random quote.")
}

pub fn quote_body(id: u64, text: &str) -> String {
    format!("💬 **Quote #{id}**\n\n{text}")
}

pub fn quote_by_id_footer(id: u64) -> String {
    format!("_Quote retrieved by ID: {id}_")
}

pub fn quote_matches_footer(count: usize, term: &str) -> String {
    if count == 1 {
        format!("_Found 1 matching quote for '{term}'_")
    } else {
        format!("_Found {count} matching quotes for '{term}'_")
    }
}

// search
pub const SEARCH_USAGE: &str =
    "Please provide a search query. Example: `!search rust matrix bot`";

pub fn searching(query: &str) -> String {
    format!("🔍 Searching for: **{query}**...")
}

pub fn search_no_results(query: &str) -> String {
    format!("No results found for: **{query}**")
}

pub fn search_failed(err: &str) -> String {
    format!("❌ Error performing search: {err}")
}

// bartender
pub const BARTENDER_URL: &str = "https://www.youtube.com/watch?v=pdEvL6jxUYA";

pub fn bartender() -> String {
    format!("🍹 **Bartender**\nRehab - Bartender\n\n🎵 [Click here to listen on YouTube]({BARTENDER_URL})")
}

// backup
pub const BACKUP_DISABLED: &str = "❌ Backup is currently disabled in config.";
pub const BACKUP_STARTED: &str = "⏳ Starting manual backup...";
pub const BACKUP_FAILED: &str = "❌ Backup failed. Check bot logs for details.";

pub fn backup_done(name: &str, at: &str) -> String {
    format!("✅ Backup completed successfully!\nArchive: `{name}`\nLast backup: {at}")
}

/// Cuts `text` to at most `max` characters, ending in "..." when shortened.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
