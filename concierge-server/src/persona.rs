//! System prompts and the coin flip that chooses between them

use rand::Rng;

pub const PLAIN_PROMPT: &str = "You are a helpful chatbot.";
pub const WITTY_PROMPT: &str = "You are a helpful chatbot, but sometimes you respond in a funny or witty way. Make the reply humorous and lighthearted.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    Plain,
    Witty,
}

impl Persona {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Persona::Plain => PLAIN_PROMPT,
            Persona::Witty => WITTY_PROMPT,
        }
    }
}

/// Picks the witty persona with a fixed probability
#[derive(Debug, Clone, Copy)]
pub struct PersonaPicker {
    funny_probability: f64,
}

impl PersonaPicker {
    pub fn new(funny_probability: f64) -> Self {
        Self {
            funny_probability: funny_probability.clamp(0.0, 1.0),
        }
    }

    pub fn pick(&self) -> Persona {
        self.pick_with(&mut rand::thread_rng())
    }

    pub fn pick_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Persona {
        if rng.gen::<f64>() < self.funny_probability {
            Persona::Witty
        } else {
            Persona::Plain
        }
    }
}

impl Default for PersonaPicker {
    fn default() -> Self {
        Self::new(0.5)
    }
}
