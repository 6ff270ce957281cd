/// Canned opponent chatter. Purely cosmetic; the match never depends on it.
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::core::controller::MatchOutcome;

pub const BOT_NAMES: [&str; 5] = ["Snarky McByte", "Quipotron", "Sass-9000", "Irony Engine", "ZingBot"];

const CHAT_LINES: [&str; 7] = [
    "I solved that while buffering. You okay over there?",
    "My circuits yawned. Can we pick up the pace?",
    "I'll dumb down to 8-bit so it's fair.",
    "Is Caps Lock your coach now, or just enthusiasm?",
    "Spellcheck is filing a complaint.",
    "Don't worry, even humans make... choices.",
    "Beep boop: that guess was... courageous.",
];

/// What the bot is reacting to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    Correct,
    Wrong,
    AlreadySolved,
    OpponentScored,
    MatchOver,
    Chat(String),
}

pub struct Banter {
    rng: StdRng,
    bot_name: &'static str,
}

impl Banter {
    pub fn new(mut rng: StdRng) -> Self {
        let bot_name = BOT_NAMES.choose(&mut rng).copied().unwrap_or(BOT_NAMES[0]);
        Self { rng, bot_name }
    }

    pub fn bot_name(&self) -> &str {
        self.bot_name
    }

    /// Opening line; a rematch also picks a fresh persona
    pub fn greeting(&mut self, rematch: bool) -> String {
        if rematch {
            self.bot_name = BOT_NAMES.choose(&mut self.rng).copied().unwrap_or(BOT_NAMES[0]);
            format!("I'm {} again. Try not to embarrass yourself this time.", self.bot_name)
        } else {
            format!("I am {}. I'm here to battle and to judge. Mostly judge.", self.bot_name)
        }
    }

    pub fn reply(&mut self, reaction: &Reaction) -> String {
        match reaction {
            Reaction::Correct => "Congrats, a correct answer. Alert the media.".to_string(),
            Reaction::Wrong => "Close. Like, 'I can see it from here' close.".to_string(),
            Reaction::AlreadySolved => "That one's done already. Keep up.".to_string(),
            Reaction::OpponentScored => "And that, dear human, is how it's done.".to_string(),
            Reaction::MatchOver => "The match is over. Press F2 if you want another beating.".to_string(),
            Reaction::Chat(msg) => {
                // One in eight lines quotes the player back at them
                if self.rng.random_ratio(1, 8) {
                    format!("Wow, \"{}\". Bold strategy. Let's see if the dictionary agrees.", msg)
                } else {
                    CHAT_LINES.choose(&mut self.rng).copied().unwrap_or(CHAT_LINES[0]).to_string()
                }
            }
        }
    }

    pub fn verdict(outcome: MatchOutcome) -> &'static str {
        match outcome {
            MatchOutcome::HumanWin => "You win. Even I'm shocked.",
            MatchOutcome::OpponentWin => "I win. Naturally.",
            MatchOutcome::Tie => "It's a tie. How statistically average of us.",
        }
    }
}
