//! Size of the packed code as the search cost.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use squish_ast::{render, RenderOptions, State};
use squish_core::Result;
use squish_search::{CommitBytes, CostFunction, Evaluation};
use std::io::Write;

/// Deflates `bytes` the way TIC-80 stores a zipped code chunk: a zlib
/// stream without its trailing checksum.
pub fn deflate(bytes: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(bytes)?;
    let mut packed = encoder.finish()?;
    packed.truncate(packed.len().saturating_sub(4));
    Ok(packed)
}

/// Size the search aims for. A result at or below `size` costs zero or
/// less, which ends the search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Target {
    pub size: u64,
    /// Reaching the size exactly is the goal; overshooting costs too
    pub exact: bool,
}

impl Target {
    pub fn new(size: u64, exact: bool) -> Self {
        Self { size, exact }
    }

    /// Cost of a packed result of `len` bytes
    pub fn cost(&self, len: u64) -> f64 {
        let diff = len as f64 - self.size as f64;
        if self.exact {
            diff.abs()
        } else {
            diff
        }
    }
}

/// Rendered source, optionally deflated. The cost is its length in bytes,
/// relative to the [`Target`].
#[derive(Debug, Clone)]
pub struct PackedSize {
    options: RenderOptions,
    level: Option<u32>,
    target: Target,
}

impl PackedSize {
    pub fn new(no_load: bool, level: Option<u32>) -> Self {
        Self {
            options: RenderOptions::compact().with_no_load(no_load),
            level,
            target: Target::default(),
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn pack(&self, state: &State) -> Result<Vec<u8>> {
        let source = render(&state.root, self.options).into_bytes();
        match self.level {
            Some(level) => deflate(&source, level),
            None => Ok(source),
        }
    }
}

impl CostFunction for PackedSize {
    type Finisher = CommitBytes;

    fn evaluate(&self, state: &State) -> Result<Evaluation<CommitBytes>> {
        let bytes = self.pack(state)?;
        let cost = self.target.cost(bytes.len() as u64);
        Ok(Evaluation::new(cost, CommitBytes(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::DeflateDecoder;
    use squish_ast::parse;
    use std::io::Read;

    #[test]
    fn test_deflated_code_inflates_back() {
        let source = b"for i=0,99 do print(i) end for i=0,99 do print(i) end";
        let packed = deflate(source, 9).unwrap();
        assert!(packed.len() < source.len());
        // zlib header, then raw deflate
        assert_eq!(packed[0] & 0x0f, 8);
        let mut inflated = Vec::new();
        DeflateDecoder::new(&packed[2..])
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, source);
    }

    #[test]
    fn test_uncompressed_cost_is_source_length() {
        let state = State::new(parse("f = function() print(1) end").unwrap());
        let evaluation = PackedSize::new(false, None).evaluate(&state).unwrap();
        assert_eq!(evaluation.finisher.0, b"f=load'print(1)'");
        assert_eq!(evaluation.cost, 16.0);

        let evaluation = PackedSize::new(true, None).evaluate(&state).unwrap();
        assert_eq!(evaluation.finisher.0, b"f=function()print(1)end");
    }

    #[test]
    fn test_target_shifts_the_cost() {
        let state = State::new(parse("x=1 y=2").unwrap());
        let cost = |target| {
            PackedSize::new(false, None)
                .with_target(target)
                .evaluate(&state)
                .unwrap()
                .cost
        };
        assert_eq!(cost(Target::default()), 7.0);
        assert_eq!(cost(Target::new(5, false)), 2.0);
        assert_eq!(cost(Target::new(10, false)), -3.0);
        assert_eq!(cost(Target::new(10, true)), 3.0);
        assert_eq!(cost(Target::new(7, true)), 0.0);
    }

    #[test]
    fn test_compressed_cost_matches_bytes() {
        let state = State::new(parse("x=1 y=2 z=3").unwrap());
        let evaluation = PackedSize::new(false, Some(9)).evaluate(&state).unwrap();
        assert_eq!(evaluation.cost, evaluation.finisher.0.len() as f64);
        assert_eq!(evaluation.finisher.0, deflate(b"x=1y=2z=3", 9).unwrap());
    }
}
