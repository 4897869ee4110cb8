//! Passphrase sources.
//!
//! Discovery chain used by the CLI (in order of precedence):
//!   1. $JFCRYPT_PASSPHRASE (non-empty)
//!   2. non-echoing prompt on the controlling terminal
//!
//! With neither available the chain fails rather than reading the
//! passphrase from stdin, which carries the data stream.

use std::io;

use jfcrypt_core::{JfcryptError, JfcryptResult};
use secrecy::{ExposeSecret, SecretString};

/// Environment variable consulted before prompting
pub const PASSPHRASE_ENV_VAR: &str = "JFCRYPT_PASSPHRASE";

/// Capability to obtain a passphrase.
pub trait PassphraseSource {
    fn acquire(&self, prompt: &str) -> JfcryptResult<SecretString>;

    /// Ask twice and require both entries to match.
    fn acquire_with_confirmation(
        &self,
        prompt: &str,
        confirm_prompt: &str,
    ) -> JfcryptResult<SecretString> {
        let first = self.acquire(prompt)?;
        let second = self.acquire(confirm_prompt)?;
        if first.expose_secret() != second.expose_secret() {
            return Err(JfcryptError::passphrase("passphrases do not match"));
        }
        Ok(first)
    }
}

/// Passphrase from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvPassphrase {
    var: String,
}

impl Default for EnvPassphrase {
    fn default() -> Self {
        Self::new(PASSPHRASE_ENV_VAR)
    }
}

impl EnvPassphrase {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// The variable's value, if set and non-empty.
    pub fn lookup(&self) -> Option<SecretString> {
        let value = std::env::var(&self.var).ok()?;
        if value.is_empty() {
            return None;
        }
        tracing::debug!(var = %self.var, "passphrase taken from environment");
        Some(SecretString::from(value))
    }
}

impl PassphraseSource for EnvPassphrase {
    fn acquire(&self, _prompt: &str) -> JfcryptResult<SecretString> {
        self.lookup()
            .ok_or_else(|| JfcryptError::passphrase(format!("{} is not set", self.var)))
    }

    /// A variable cannot be mistyped twice; no second read.
    fn acquire_with_confirmation(
        &self,
        prompt: &str,
        _confirm_prompt: &str,
    ) -> JfcryptResult<SecretString> {
        self.acquire(prompt)
    }
}

type PromptFn = fn(&str) -> io::Result<String>;

/// Non-echoing prompt on the controlling terminal.
pub struct TerminalPassphrase<F = PromptFn> {
    read: F,
}

impl TerminalPassphrase {
    pub fn new() -> Self {
        Self {
            read: prompt_tty,
        }
    }
}

fn prompt_tty(prompt: &str) -> io::Result<String> {
    rpassword::prompt_password(prompt)
}

impl Default for TerminalPassphrase {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Fn(&str) -> io::Result<String>> TerminalPassphrase<F> {
    /// Use `read` instead of the real terminal.
    pub fn with_reader(read: F) -> Self {
        Self { read }
    }
}

impl<F: Fn(&str) -> io::Result<String>> PassphraseSource for TerminalPassphrase<F> {
    fn acquire(&self, prompt: &str) -> JfcryptResult<SecretString> {
        let entered = (self.read)(prompt).map_err(|e| {
            tracing::debug!(error = %e, "terminal prompt unavailable");
            JfcryptError::passphrase(format!(
                "cannot read passphrase: no terminal available. Set {PASSPHRASE_ENV_VAR} environment variable"
            ))
        })?;
        let secret = SecretString::from(entered);
        if secret.expose_secret().is_empty() {
            return Err(JfcryptError::passphrase("passphrase cannot be empty"));
        }
        Ok(secret)
    }
}

/// Environment first, then `fallback`.
pub struct PassphraseChain {
    env: EnvPassphrase,
    fallback: Box<dyn PassphraseSource>,
}

impl PassphraseChain {
    pub fn new(env: EnvPassphrase, fallback: Box<dyn PassphraseSource>) -> Self {
        Self { env, fallback }
    }
}

impl Default for PassphraseChain {
    fn default() -> Self {
        Self::new(EnvPassphrase::default(), Box::new(TerminalPassphrase::new()))
    }
}

impl PassphraseSource for PassphraseChain {
    fn acquire(&self, prompt: &str) -> JfcryptResult<SecretString> {
        match self.env.lookup() {
            Some(secret) => Ok(secret),
            None => self.fallback.acquire(prompt),
        }
    }

    fn acquire_with_confirmation(
        &self,
        prompt: &str,
        confirm_prompt: &str,
    ) -> JfcryptResult<SecretString> {
        match self.env.lookup() {
            Some(secret) => Ok(secret),
            None => self.fallback.acquire_with_confirmation(prompt, confirm_prompt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Replays scripted terminal entries and records the prompts shown.
    fn scripted(
        entries: &[&str],
    ) -> (
        TerminalPassphrase<impl Fn(&str) -> io::Result<String>>,
        Rc<RefCell<Vec<String>>>,
    ) {
        let queue = RefCell::new(entries.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        let prompts = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&prompts);
        let source = TerminalPassphrase::with_reader(move |prompt: &str| {
            seen.borrow_mut().push(prompt.to_string());
            let mut q = queue.borrow_mut();
            if q.is_empty() {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no tty"));
            }
            Ok(q.remove(0))
        });
        (source, prompts)
    }

    #[test]
    fn test_terminal_acquire() {
        let (source, prompts) = scripted(&["hunter2"]);
        let secret = source.acquire("Enter passphrase: ").unwrap();
        assert_eq!(secret.expose_secret(), "hunter2");
        assert_eq!(prompts.borrow().as_slice(), ["Enter passphrase: "]);
    }

    #[test]
    fn test_confirmation_match() {
        let (source, prompts) = scripted(&["same", "same"]);
        let secret = source
            .acquire_with_confirmation("Enter passphrase: ", "Confirm passphrase: ")
            .unwrap();
        assert_eq!(secret.expose_secret(), "same");
        assert_eq!(prompts.borrow().len(), 2);
    }

    #[test]
    fn test_confirmation_mismatch() {
        let (source, _) = scripted(&["first", "second"]);
        let err = source
            .acquire_with_confirmation("Enter passphrase: ", "Confirm passphrase: ")
            .unwrap_err();
        assert!(matches!(err, JfcryptError::Passphrase(_)));
        assert!(err.to_string().contains("do not match"));
    }

    #[test]
    fn test_no_terminal() {
        let (source, _) = scripted(&[]);
        let err = source.acquire("Enter passphrase: ").unwrap_err();
        assert!(err.to_string().contains(PASSPHRASE_ENV_VAR));
    }

    #[test]
    fn test_empty_entry_rejected() {
        let (source, _) = scripted(&[""]);
        assert!(matches!(
            source.acquire("Enter passphrase: "),
            Err(JfcryptError::Passphrase(_))
        ));
    }

    #[test]
    fn test_env_source() {
        std::env::set_var("JFCRYPT_TEST_ENV_SOURCE", "from-env");
        let source = EnvPassphrase::new("JFCRYPT_TEST_ENV_SOURCE");
        assert_eq!(source.acquire("ignored").unwrap().expose_secret(), "from-env");
        assert_eq!(
            source
                .acquire_with_confirmation("a", "b")
                .unwrap()
                .expose_secret(),
            "from-env"
        );
    }

    #[test]
    fn test_env_unset_or_empty() {
        std::env::set_var("JFCRYPT_TEST_ENV_EMPTY", "");
        assert!(EnvPassphrase::new("JFCRYPT_TEST_ENV_EMPTY").lookup().is_none());
        assert!(EnvPassphrase::new("JFCRYPT_TEST_ENV_NEVER_SET")
            .acquire("x")
            .is_err());
    }

    #[test]
    fn test_chain_prefers_env() {
        std::env::set_var("JFCRYPT_TEST_CHAIN_SET", "env-wins");
        let (terminal, prompts) = scripted(&["terminal"]);
        let chain = PassphraseChain::new(
            EnvPassphrase::new("JFCRYPT_TEST_CHAIN_SET"),
            Box::new(terminal),
        );

        let secret = chain.acquire_with_confirmation("p", "c").unwrap();
        assert_eq!(secret.expose_secret(), "env-wins");
        assert!(prompts.borrow().is_empty(), "terminal must not be touched");
    }

    #[test]
    fn test_chain_falls_back_to_terminal() {
        let (terminal, prompts) = scripted(&["typed", "typed"]);
        let chain = PassphraseChain::new(
            EnvPassphrase::new("JFCRYPT_TEST_CHAIN_UNSET"),
            Box::new(terminal),
        );

        let secret = chain.acquire_with_confirmation("p", "c").unwrap();
        assert_eq!(secret.expose_secret(), "typed");
        assert_eq!(prompts.borrow().as_slice(), ["p", "c"]);
    }
}
