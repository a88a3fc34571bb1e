use crate::config::Config;
use rand::Rng;

/// Which character domain a configuration draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum CharPolicy {
    #[strum(serialize = "binary")]
    Binary,
    #[strum(serialize = "digits")]
    Digits,
    #[strum(serialize = "custom")]
    Custom,
    #[strum(serialize = "printable")]
    Printable,
}

impl CharPolicy {
    /// Custom characters take precedence over the digit policy; an empty
    /// custom alphabet widens to the whole printable ASCII range.
    pub fn of(config: &Config) -> Self {
        if config.use_custom_chars {
            if config.custom_chars.is_empty() {
                CharPolicy::Printable
            } else {
                CharPolicy::Custom
            }
        } else if config.allow_non_binary_digits {
            CharPolicy::Digits
        } else {
            CharPolicy::Binary
        }
    }
}

/// The characters a configuration may draw from. Duplicates in a custom
/// alphabet are kept so repetition weights the draw.
pub fn char_domain(config: &Config) -> Vec<char> {
    match CharPolicy::of(config) {
        CharPolicy::Binary => vec!['0', '1'],
        CharPolicy::Digits => ('0'..='9').collect(),
        CharPolicy::Custom => config.custom_chars.chars().collect(),
        CharPolicy::Printable => (33u8..=126).map(char::from).collect(),
    }
}

/// Draws a fresh answer string of `config.length` characters, uniformly
/// over the configured domain.
pub fn generate<R: Rng>(config: &Config, rng: &mut R) -> String {
    let domain = char_domain(config);
    (0..config.length)
        .map(|_| domain[rng.gen_range(0..domain.len())])
        .collect()
}
