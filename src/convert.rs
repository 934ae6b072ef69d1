/*
  Order-preserving translation of 32 bit signed integers to unsigned 32 bit
  integers (and the reverse operation, used when decrypting).

  The mapping is the affine shift by 2^31: flipping the sign bit sends
  i32::MIN to 0 and i32::MAX to u32::MAX, so an array of signed values keeps
  its ordering after conversion. The unsigned value is what the schemes
  decompose into bits and blocks.
*/

pub(crate) trait ToOrderedInteger<T> {
    fn map_to(&self) -> T;
}

pub(crate) trait FromOrderedInteger<T> {
    fn map_from(input: T) -> Self;
}

impl ToOrderedInteger<u32> for i32 {
    fn map_to(&self) -> u32 {
        (*self as u32) ^ 0x8000_0000
    }
}

impl FromOrderedInteger<u32> for i32 {
    fn map_from(input: u32) -> i32 {
        (input ^ 0x8000_0000) as i32
    }
}
