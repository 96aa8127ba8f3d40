//! Amount to spoken-token decomposition (Indian numbering system)
//!
//! The rupee part is read by groups (crore, lakh, thousand, hundred, remainder)
//! using whole-number words. The paise part is read digit by digit after
//! `point`, never as a tens word.

use crate::amount::{Amount, AmountError};
use crate::token::SoundToken;

pub type TokenSequence = Vec<SoundToken>;

const CRORE: u64 = 10_000_000;
const LAKH: u64 = 100_000;
const THOUSAND: u64 = 1_000;
const HUNDRED: u64 = 100;

/// Decompose a raw value into the token sequence announcing it.
///
/// Fails with `AmountError` if the value is negative or not finite.
pub fn decompose(value: f64) -> Result<TokenSequence, AmountError> {
    Amount::new(value).map(decompose_amount)
}

/// Decompose an already validated amount
pub fn decompose_amount(amount: Amount) -> TokenSequence {
    let mut tokens = vec![SoundToken::Amount];

    let rupees = amount.rupees();
    let paise = amount.paise();

    let groups = [
        (rupees / CRORE, SoundToken::Crore),
        ((rupees % CRORE) / LAKH, SoundToken::Lakh),
        ((rupees % LAKH) / THOUSAND, SoundToken::Thousand),
    ];
    for (count, magnitude) in groups {
        if count > 0 {
            push_small(&mut tokens, count);
            tokens.push(magnitude);
        }
    }

    let hundreds = (rupees % THOUSAND) / HUNDRED;
    if hundreds > 0 {
        tokens.push(SoundToken::Number(hundreds));
        tokens.push(SoundToken::Hundred);
    }

    let remainder = rupees % HUNDRED;
    if remainder > 0 {
        push_small(&mut tokens, remainder);
    }

    if paise > 0 {
        tokens.push(SoundToken::Point);
        let tens = paise / 10;
        if tens > 0 {
            tokens.push(SoundToken::Number(tens));
        }
        let ones = paise % 10;
        if ones > 0 {
            tokens.push(SoundToken::Number(ones));
        }
    }

    tokens
}

/// Render 1-99: a direct clip up to 20, otherwise tens word then ones digit.
///
/// Crore counts of 100 or more also land here and produce a tens token with
/// no clip (e.g. `120`); rendering then fails at resolution time.
fn push_small(tokens: &mut TokenSequence, n: u64) {
    if n <= 20 {
        tokens.push(SoundToken::Number(n));
        return;
    }
    tokens.push(SoundToken::Number(n / 10 * 10));
    if n % 10 > 0 {
        tokens.push(SoundToken::Number(n % 10));
    }
}
