//! Search state: the program tree plus its reorderable data sections.

use crate::node::Node;
use serde::{Deserialize, Serialize};
use squish_core::{Error, Result};

/// Leading bytes of every snapshot
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"SQSH";
/// Bumped whenever the encoded layout of [`State`] changes
pub const SNAPSHOT_VERSION: u16 = 1;

/// Opaque chunk of cart data whose position in the output may be chosen
/// freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub data: Vec<u8>,
}

impl Section {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// The unit that is cloned, mutated, evaluated and accepted or rejected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub root: Node,
    pub sections: Option<Vec<Section>>,
}

impl State {
    pub fn new(root: Node) -> Self {
        Self {
            root,
            sections: None,
        }
    }

    pub fn with_sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = Some(sections);
        self
    }

    /// Encodes the state as a versioned snapshot for handing to another
    /// thread.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)?;
        let mut bytes = Vec::with_capacity(SNAPSHOT_MAGIC.len() + 2 + body.len());
        bytes.extend_from_slice(SNAPSHOT_MAGIC);
        bytes.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = SNAPSHOT_MAGIC.len() + 2;
        if bytes.len() < header || &bytes[..SNAPSHOT_MAGIC.len()] != SNAPSHOT_MAGIC {
            return Err(Error::UnsupportedSnapshot("missing snapshot header".into()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != SNAPSHOT_VERSION {
            return Err(Error::UnsupportedSnapshot(format!(
                "snapshot version {version}, expected {SNAPSHOT_VERSION}"
            )));
        }
        Ok(bincode::deserialize(&bytes[header..])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Origin;
    use crate::numeral::Numeral;
    use crate::ops::BinaryOp;
    use crate::parser::parse;
    use proptest::prelude::*;

    #[test]
    fn test_snapshot_round_trip() {
        let state = State::new(parse("x=1+2 for i=1,10 do print(i) end").unwrap())
            .with_sections(vec![Section::new("gfx", vec![1, 2, 3])]);
        let bytes = state.to_bytes().unwrap();
        assert_eq!(&bytes[..4], SNAPSHOT_MAGIC);
        assert_eq!(State::from_bytes(&bytes).unwrap(), state);
    }

    #[test]
    fn test_snapshot_keeps_origin() {
        let folded = Node::Numeral {
            value: Numeral::integer(3),
            origin: Origin::of(Node::bin(Node::int(1), BinaryOp::Add, Node::int(2))),
        };
        let state = State::new(Node::chunk(vec![Node::assign(vec![Node::name("x")], vec![folded])]));
        let decoded = State::from_bytes(&state.to_bytes().unwrap()).unwrap();
        let Node::Block(block) = &decoded.root else {
            panic!("expected block");
        };
        let Node::Assign { values, .. } = &block.stats[0] else {
            panic!("expected assignment");
        };
        assert!(values[0].origin().is_some());
    }

    #[test]
    fn test_rejects_foreign_bytes() {
        assert!(matches!(
            State::from_bytes(b"nope"),
            Err(Error::UnsupportedSnapshot(_))
        ));
        let mut bytes = State::new(Node::chunk(vec![])).to_bytes().unwrap();
        bytes[4] = 99;
        assert!(matches!(
            State::from_bytes(&bytes),
            Err(Error::UnsupportedSnapshot(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_sections_round_trip(data in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..16), 0..6)) {
            let sections = data
                .into_iter()
                .enumerate()
                .map(|(i, bytes)| Section::new(format!("s{i}"), bytes))
                .collect();
            let state = State::new(Node::chunk(vec![Node::Break])).with_sections(sections);
            let decoded = State::from_bytes(&state.to_bytes()?).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(decoded, state);
        }
    }
}
