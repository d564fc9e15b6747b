//! # Help Text
//!
//! The overview shown by the `triggers` command.

pub fn triggers(p: &str) -> String {
    format!(
        concat!(
            "**🤖 NiceBot Commands & Triggers**\n",
            "Here's everything I can do!\n",
            "\n",
            "**📋 Commands**\n",
            "* {p}weather [zip]: Current weather conditions\n",
            "* {p}forecast [zip]: 5-day weather forecast\n",
            "* {p}setlocation <zip>: Save your zip code\n",
            "* {p}stock <ticker>: Stock prices (e.g., AAPL, BTC-USD)\n",
            "* {p}quote [search]: Random quote or search quotes\n",
            "* {p}chat <prompt>: Chat with AI (remembers context) 🤖\n",
            "  * {p}chat reset: Clear your conversation\n",
            "  * {p}chat history: Show conversation stats\n",
            "* {p}friday: Friday celebration (Fridays only!)\n",
            "* {p}bartender: Link to Bartender song 🍹\n",
            "* {p}count: Nice count statistics\n",
            "* {p}search <query>: DuckDuckGo search\n",
            "* {p}triggers: Show this help message\n",
            "* {p}backup: Run a data backup now (admins only)\n",
            "\n",
            "**⚡ Automatic Triggers**\n",
            "* **nice** → Responds \"Nice!\" 🎉\n",
            "* **shut up** → Responds \"No, u!\" 😤\n",
            "* **eagles** → Random Eagles chant 🦅 _(10-minute cooldown per channel)_\n",
            "* **fuck dallas** → Random Eagles chant 🦅 _(no cooldown, always responds)_\n",
            "\n",
            "✏️ Customize the chants in `eagles_responses.json`\n",
            "\n",
            "_💡 Tip: Use {p}setlocation once, then {p}weather and {p}forecast work without a zip code!_"
        ),
        p = p
    )
}
