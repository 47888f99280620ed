//! Interactive prompts used outside the list UI.
//!
//! Commands talk to a `Prompter` rather than to the terminal, so unlock
//! and lock-method flows can be exercised with scripted answers.

use dialoguer::{Confirm, Input, Password};
use zeroize::Zeroizing;

use crate::errors::{EnvSwitchError, Result};

/// How a vault should be locked, as chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockChoice {
    Password,
    Keychain,
}

impl LockChoice {
    /// Parse the first letter of an answer (`p` or `k`, any case).
    pub fn parse(answer: &str) -> Option<Self> {
        match answer.trim().chars().next()?.to_ascii_lowercase() {
            'p' => Some(Self::Password),
            'k' => Some(Self::Keychain),
            _ => None,
        }
    }
}

pub trait Prompter {
    /// Read a password without echo.
    fn password(&mut self, prompt: &str) -> Result<Zeroizing<String>>;

    /// Read a new password twice.  Fails with `PasswordMismatch` if the
    /// two entries differ.
    fn new_password(&mut self) -> Result<Zeroizing<String>>;

    /// Ask "[p]assword or [k]eychain".
    fn lock_choice(&mut self) -> Result<LockChoice>;

    /// Yes/no question.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;
}

fn prompt_failed(e: dialoguer::Error) -> EnvSwitchError {
    EnvSwitchError::CommandFailed(format!("prompt failed: {e}"))
}

/// Prompts on the controlling terminal via `dialoguer` (stderr).
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn password(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map(Zeroizing::new)
            .map_err(prompt_failed)
    }

    fn new_password(&mut self) -> Result<Zeroizing<String>> {
        let first = self.password("Enter password")?;
        let second = self.password("Confirm password")?;
        if *first != *second {
            return Err(EnvSwitchError::PasswordMismatch);
        }
        Ok(first)
    }

    fn lock_choice(&mut self) -> Result<LockChoice> {
        let answer: String = Input::new()
            .with_prompt("Lock variables with [p]assword or [k]eychain?")
            .validate_with(|input: &String| -> std::result::Result<(), &str> {
                LockChoice::parse(input)
                    .map(|_| ())
                    .ok_or("answer p or k")
            })
            .interact_text()
            .map_err(prompt_failed)?;

        LockChoice::parse(&answer)
            .ok_or_else(|| EnvSwitchError::CommandFailed(format!("invalid choice: {answer}")))
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(prompt_failed)
    }
}

/// A prompter that replays canned answers, for tests.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    pub passwords: Vec<String>,
    pub choices: Vec<LockChoice>,
    pub confirmations: Vec<bool>,
    /// Number of `password` calls made so far.
    pub password_prompts: usize,
}

impl ScriptedPrompter {
    pub fn with_passwords<I, S>(passwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passwords: passwords.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn exhausted(what: &str) -> EnvSwitchError {
        EnvSwitchError::CommandFailed(format!("no scripted {what} left"))
    }
}

impl Prompter for ScriptedPrompter {
    fn password(&mut self, _prompt: &str) -> Result<Zeroizing<String>> {
        self.password_prompts += 1;
        if self.passwords.is_empty() {
            return Err(Self::exhausted("password"));
        }
        Ok(Zeroizing::new(self.passwords.remove(0)))
    }

    fn new_password(&mut self) -> Result<Zeroizing<String>> {
        let first = self.password("new")?;
        let second = self.password("confirm")?;
        if *first != *second {
            return Err(EnvSwitchError::PasswordMismatch);
        }
        Ok(first)
    }

    fn lock_choice(&mut self) -> Result<LockChoice> {
        if self.choices.is_empty() {
            return Err(Self::exhausted("choice"));
        }
        Ok(self.choices.remove(0))
    }

    fn confirm(&mut self, _prompt: &str, default: bool) -> Result<bool> {
        if self.confirmations.is_empty() {
            return Ok(default);
        }
        Ok(self.confirmations.remove(0))
    }
}
