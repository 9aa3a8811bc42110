use crate::FastMap;
use crate::error::MathError;
use alloy_primitives::U256;

/// Sparse map of 256‑tick words, keyed by word index of the compressed tick.
pub type TickBitmap = FastMap<i16, U256>;

/// Word index and bit position of a compressed tick.
pub fn position(compressed: i32) -> (i16, u8) {
    ((compressed >> 8) as i16, (compressed & 0xff) as u8)
}

pub fn get_word(bitmap: &TickBitmap, word: i16) -> U256 {
    bitmap.get(&word).copied().unwrap_or(U256::ZERO)
}

fn most_significant_bit(x: U256) -> Result<u8, MathError> {
    if x.is_zero() {
        return Err(MathError::ZeroValue);
    }
    Ok(255 - x.leading_zeros() as u8)
}

fn least_significant_bit(x: U256) -> Result<u8, MathError> {
    if x.is_zero() {
        return Err(MathError::ZeroValue);
    }
    Ok(x.trailing_zeros() as u8)
}

/// Toggles the initialized flag of `tick`, which must be a multiple of
/// `tick_spacing`.
pub fn flip_tick(bitmap: &mut TickBitmap, tick: i32, tick_spacing: i32) -> Result<(), MathError> {
    if tick % tick_spacing != 0 {
        return Err(MathError::OutOfBounds);
    }

    let (word_pos, bit_pos) = position(tick / tick_spacing);
    let word = bitmap.entry(word_pos).or_insert(U256::ZERO);
    *word ^= U256::ONE << bit_pos;
    if word.is_zero() {
        bitmap.remove(&word_pos);
    }
    Ok(())
}

/// Finds the next initialized tick in the word containing `tick`, searching
/// at or below it when `lte`, strictly above it otherwise.
///
/// When nothing is initialized in the word, the word boundary is returned
/// with `false` so the caller can step across it.
pub fn next_initialized_tick_within_one_word(
    bitmap: &TickBitmap,
    tick: i32,
    tick_spacing: i32,
    lte: bool,
) -> Result<(i32, bool), MathError> {
    let compressed = tick.div_euclid(tick_spacing);

    if lte {
        let (word_pos, bit_pos) = position(compressed);
        // all bits at or below bit_pos
        let mask = U256::MAX >> (255 - bit_pos as usize);
        let masked = get_word(bitmap, word_pos) & mask;

        if masked.is_zero() {
            Ok(((compressed - bit_pos as i32) * tick_spacing, false))
        } else {
            let msb = most_significant_bit(masked)?;
            Ok(((compressed - (bit_pos - msb) as i32) * tick_spacing, true))
        }
    } else {
        let (word_pos, bit_pos) = position(compressed + 1);
        // all bits at or above bit_pos
        let mask = U256::MAX << bit_pos as usize;
        let masked = get_word(bitmap, word_pos) & mask;

        if masked.is_zero() {
            Ok(((compressed + 1 + (255 - bit_pos) as i32) * tick_spacing, false))
        } else {
            let lsb = least_significant_bit(masked)?;
            Ok(((compressed + 1 + (lsb - bit_pos) as i32) * tick_spacing, true))
        }
    }
}
