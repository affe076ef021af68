// utils.rs - onion packet utility functions
// Copyright (C) 2018  David Anthony Stainton and Jeffrey Burdges.
//
// MIT License
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

/// xor `b` into `a` in place; both must have the same length.
pub fn xor_assign(a: &mut [u8], b: &[u8]) {
    assert_eq!(a.len(), b.len());
    for (a_i, &b_i) in a.iter_mut().zip(b.iter()) {
        *a_i ^= b_i;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_assign_test() {
        let mut a = [0x0f, 0xf0, 0xaa];
        xor_assign(&mut a, &[0xff, 0xff, 0xaa]);
        assert_eq!(a, [0xf0, 0x0f, 0x00]);
    }

    #[test]
    #[should_panic]
    fn xor_assign_length_mismatch_test() {
        let mut a = [0u8; 3];
        xor_assign(&mut a, &[0u8; 4]);
    }
}
