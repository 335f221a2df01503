use crate::{
    args::Value,
    command::CommandKind,
    sequence::{Node, SequenceKind},
};

/// Stable 128-bit structural fingerprint of a node.
///
/// Covers kind, flattened arguments and children; annotations are ignored, so
/// two nodes with equal fingerprints are interchangeable in the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeFingerprint {
    pub hi: u64,
    pub lo: u64,
}

pub fn fingerprint_node(node: &Node) -> NodeFingerprint {
    let mut a = Fnv1a64::new(0xcbf29ce484222325);
    let mut b = Fnv1a64::new(0x9ae16a3b2f90404f);
    write_node_pair(&mut a, &mut b, node);
    NodeFingerprint {
        hi: a.finish(),
        lo: b.finish(),
    }
}

fn write_node_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, node: &Node) {
    match node {
        Node::Command(c) => {
            write_u8_pair(a, b, 0);
            write_u8_pair(a, b, command_tag(c.kind()));
            write_values_pair(a, b, &c.args().flatten());
        }
        Node::Sequence(s) => {
            write_u8_pair(a, b, 1);
            write_u8_pair(a, b, sequence_tag(s.kind()));
            write_values_pair(a, b, &s.args().flatten());
            write_u64_pair(a, b, s.children().len() as u64);
            for child in s.children() {
                write_node_pair(a, b, child);
            }
        }
    }
}

fn command_tag(kind: CommandKind) -> u8 {
    match kind {
        CommandKind::TimeAnchor => 0,
        CommandKind::ConstantDefine => 1,
        CommandKind::NoOp => 2,
        CommandKind::Delay => 3,
        CommandKind::SetColor => 4,
        CommandKind::SetRed => 5,
        CommandKind::SetGreen => 6,
        CommandKind::SetBlue => 7,
        CommandKind::Ramp => 8,
        CommandKind::SubroutineCall => 9,
    }
}

fn sequence_tag(kind: SequenceKind) -> u8 {
    match kind {
        SequenceKind::Program => 0,
        SequenceKind::SubroutineDef => 1,
        SequenceKind::Loop => 2,
    }
}

fn write_values_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, values: &[Value]) {
    write_u64_pair(a, b, values.len() as u64);
    for v in values {
        match v {
            Value::Int(i) => {
                write_u8_pair(a, b, 0);
                write_u64_pair(a, b, *i as u64);
            }
            Value::Ident(s) => {
                write_u8_pair(a, b, 1);
                write_str_pair(a, b, s);
            }
        }
    }
}

fn write_u8_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, v: u8) {
    a.write_u8(v);
    b.write_u8(v);
}

fn write_u64_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, v: u64) {
    a.write_u64(v);
    b.write_u64(v);
}

fn write_str_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, s: &str) {
    write_u64_pair(a, b, s.len() as u64);
    a.write_bytes(s.as_bytes());
    b.write_bytes(s.as_bytes());
}

#[derive(Clone, Copy)]
struct Fnv1a64(u64);

impl Fnv1a64 {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        self.0 = h;
    }

    fn finish(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{command::Command, sequence::Sequence};

    #[test]
    fn fingerprint_ignores_annotations() {
        let a = Node::from(Command::delay(10).with_annotation(" ; a"));
        let b = Node::from(Command::delay(10));
        assert_eq!(fingerprint_node(&a), fingerprint_node(&b));
    }

    #[test]
    fn fingerprint_changes_with_arguments_and_kind() {
        let d10 = Node::from(Command::delay(10));
        let d11 = Node::from(Command::delay(11));
        let call = Node::from(Command::call("x"));
        let call_y = Node::from(Command::call("y"));
        assert_ne!(fingerprint_node(&d10), fingerprint_node(&d11));
        assert_ne!(fingerprint_node(&call), fingerprint_node(&call_y));

        let mut lp = Sequence::looped(10);
        lp.push(Command::delay(10)).unwrap();
        assert_ne!(fingerprint_node(&Node::from(lp)), fingerprint_node(&d10));
    }
}
