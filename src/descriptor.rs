//! Descriptor table: the schema-of-record for the Tagnet namespace.
//!
//! The built-in table is the output of the Tagnet schema compiler for the
//! tag platform. The generator only annotated parenthood in comments, so the
//! `parent` column here is reconstructed from those annotations.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Root id
pub const ROOT_ID: u16 = 0;

/// One past the highest id in the built-in table
pub const LAST_ID: u16 = 40;

/// Upper bound on ids in any table
pub const MAX_ID: u16 = 65000;

/// Qualifier naming the adapter list itself
pub const UQ_TAGNET_ADAPTER_LIST: &str = "UQ_TAGNET_ADAPTER_LIST";

/// Qualifier of the root node
pub const UQ_TN_ROOT: &str = "TN_0_UQ";

/// One row of the descriptor table, TLV fields still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub id: u16,
    pub name_tlv: Vec<u8>,
    pub help_tlv: Vec<u8>,
    /// Adapter class bound to this node; empty for structural nodes
    pub qualifier: String,
    /// `None` only for the root
    pub parent_id: Option<u16>,
}

/// Closed set of node ids in the built-in namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum TnId {
    Root = 0,
    Tag = 1,
    Poll = 2,
    PollEv = 3,
    PollCnt = 4,
    Info = 5,
    InfoSens = 6,
    SensGps = 7,
    GpsXyz = 8,
    GpsCmd = 9,
    Sd = 10,
    Sd0 = 11,
    Sd0Dblk = 12,
    DblkByte = 13,
    DblkNote = 14,
    DblkRecnum = 15,
    DblkLastRec = 16,
    DblkLastSync = 17,
    DblkCommitted = 18,
    Sd0Img = 19,
    Sd0Panic = 20,
    PanicByte = 21,
    Sys = 22,
    SysActive = 23,
    SysBackup = 24,
    SysGolden = 25,
    SysNib = 26,
    SysRunning = 27,
    SysRtc = 28,
    Test = 29,
    TestZero = 30,
    ZeroByte = 31,
    TestOnes = 32,
    OnesByte = 33,
    TestEcho = 34,
    EchoByte = 35,
    TestDrop = 36,
    DropByte = 37,
    TestRssi = 38,
    TestTxPwr = 39,
}

impl TnId {
    /// Every id, in id order
    pub const ALL: [TnId; LAST_ID as usize] = [
        TnId::Root,
        TnId::Tag,
        TnId::Poll,
        TnId::PollEv,
        TnId::PollCnt,
        TnId::Info,
        TnId::InfoSens,
        TnId::SensGps,
        TnId::GpsXyz,
        TnId::GpsCmd,
        TnId::Sd,
        TnId::Sd0,
        TnId::Sd0Dblk,
        TnId::DblkByte,
        TnId::DblkNote,
        TnId::DblkRecnum,
        TnId::DblkLastRec,
        TnId::DblkLastSync,
        TnId::DblkCommitted,
        TnId::Sd0Img,
        TnId::Sd0Panic,
        TnId::PanicByte,
        TnId::Sys,
        TnId::SysActive,
        TnId::SysBackup,
        TnId::SysGolden,
        TnId::SysNib,
        TnId::SysRunning,
        TnId::SysRtc,
        TnId::Test,
        TnId::TestZero,
        TnId::ZeroByte,
        TnId::TestOnes,
        TnId::OnesByte,
        TnId::TestEcho,
        TnId::EchoByte,
        TnId::TestDrop,
        TnId::DropByte,
        TnId::TestRssi,
        TnId::TestTxPwr,
    ];

    pub fn id(self) -> u16 {
        self as u16
    }

    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Unique qualifier string, `TN_<id>_UQ`
    pub fn qualifier(self) -> &'static str {
        BUILTIN[self as usize].qualifier
    }

    pub fn parent(self) -> Option<TnId> {
        BUILTIN[self as usize].parent
    }
}

struct StaticDescriptor {
    id: TnId,
    name_tlv: &'static [u8],
    qualifier: &'static str,
    parent: Option<TnId>,
}

const HELP_TLV: &[u8] = b"\x01\x04help";

const fn node(
    id: TnId,
    name_tlv: &'static [u8],
    qualifier: &'static str,
    parent: Option<TnId>,
) -> StaticDescriptor {
    StaticDescriptor {
        id,
        name_tlv,
        qualifier,
        parent,
    }
}

use TnId::*;

#[rustfmt::skip]
static BUILTIN: [StaticDescriptor; LAST_ID as usize] = [
    node(Root,          b"\x01\x04root",       "TN_0_UQ",  None),
    node(Tag,           b"\x01\x03tag",        "TN_1_UQ",  Some(Root)),
    node(Poll,          b"\x01\x04poll",       "TN_2_UQ",  Some(Tag)),
    node(PollEv,        b"\x01\x02ev",         "TN_3_UQ",  Some(Poll)),
    node(PollCnt,       b"\x01\x03cnt",        "TN_4_UQ",  Some(Poll)),
    node(Info,          b"\x01\x04info",       "TN_5_UQ",  Some(Tag)),
    node(InfoSens,      b"\x01\x04sens",       "TN_6_UQ",  Some(Info)),
    node(SensGps,       b"\x01\x03gps",        "TN_7_UQ",  Some(InfoSens)),
    node(GpsXyz,        b"\x01\x03xyz",        "TN_8_UQ",  Some(SensGps)),
    node(GpsCmd,        b"\x01\x03cmd",        "TN_9_UQ",  Some(SensGps)),
    node(Sd,            b"\x01\x02sd",         "TN_10_UQ", Some(Tag)),
    node(Sd0,           b"\x02\x01\x00",       "TN_11_UQ", Some(Sd)),
    node(Sd0Dblk,       b"\x01\x04dblk",       "TN_12_UQ", Some(Sd0)),
    node(DblkByte,      b"\x01\x04byte",       "TN_13_UQ", Some(Sd0Dblk)),
    node(DblkNote,      b"\x01\x04note",       "TN_14_UQ", Some(Sd0Dblk)),
    node(DblkRecnum,    b"\x01\x07.recnum",    "TN_15_UQ", Some(Sd0Dblk)),
    node(DblkLastRec,   b"\x01\x09.last_rec",  "TN_16_UQ", Some(Sd0Dblk)),
    node(DblkLastSync,  b"\x01\x0a.last_sync", "TN_17_UQ", Some(Sd0Dblk)),
    node(DblkCommitted, b"\x01\x0a.committed", "TN_18_UQ", Some(Sd0Dblk)),
    node(Sd0Img,        b"\x01\x03img",        "TN_19_UQ", Some(Sd0)),
    node(Sd0Panic,      b"\x01\x05panic",      "TN_20_UQ", Some(Sd0)),
    node(PanicByte,     b"\x01\x04byte",       "TN_21_UQ", Some(Sd0Panic)),
    node(Sys,           b"\x01\x03sys",        "TN_22_UQ", Some(Tag)),
    node(SysActive,     b"\x01\x06active",     "TN_23_UQ", Some(Sys)),
    node(SysBackup,     b"\x01\x06backup",     "TN_24_UQ", Some(Sys)),
    node(SysGolden,     b"\x01\x06golden",     "TN_25_UQ", Some(Sys)),
    node(SysNib,        b"\x01\x03nib",        "TN_26_UQ", Some(Sys)),
    node(SysRunning,    b"\x01\x07running",    "TN_27_UQ", Some(Sys)),
    node(SysRtc,        b"\x01\x03rtc",        "TN_28_UQ", Some(Sys)),
    node(Test,          b"\x01\x05.test",      "TN_29_UQ", Some(Tag)),
    node(TestZero,      b"\x01\x04zero",       "TN_30_UQ", Some(Test)),
    node(ZeroByte,      b"\x01\x04byte",       "TN_31_UQ", Some(TestZero)),
    node(TestOnes,      b"\x01\x04ones",       "TN_32_UQ", Some(Test)),
    node(OnesByte,      b"\x01\x04byte",       "TN_33_UQ", Some(TestOnes)),
    node(TestEcho,      b"\x01\x04echo",       "TN_34_UQ", Some(Test)),
    node(EchoByte,      b"\x01\x04byte",       "TN_35_UQ", Some(TestEcho)),
    node(TestDrop,      b"\x01\x04drop",       "TN_36_UQ", Some(Test)),
    node(DropByte,      b"\x01\x04byte",       "TN_37_UQ", Some(TestDrop)),
    node(TestRssi,      b"\x01\x04rssi",       "TN_38_UQ", Some(Test)),
    node(TestTxPwr,     b"\x01\x06tx_pwr",     "TN_39_UQ", Some(Test)),
];

/// Errors loading a descriptor table from a schema file
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse schema file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("node {id}: bad hex in {field}: {source}")]
    Hex {
        id: u16,
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },
}

/// Schema compiler output as written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    node: Vec<SchemaNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaNode {
    id: u16,
    /// Hex of the name TLV
    name: String,
    /// Hex of the help TLV
    help: String,
    #[serde(default)]
    qualifier: String,
    #[serde(default)]
    parent: Option<u16>,
}

/// Immutable list of descriptors, in the order the generator emitted them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTable {
    entries: Vec<Descriptor>,
}

impl DescriptorTable {
    pub fn new(entries: Vec<Descriptor>) -> Self {
        Self { entries }
    }

    /// The generated Tagnet table for the tag platform
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|d| Descriptor {
                id: d.id.id(),
                name_tlv: d.name_tlv.to_vec(),
                help_tlv: HELP_TLV.to_vec(),
                qualifier: d.qualifier.to_string(),
                parent_id: d.parent.map(TnId::id),
            })
            .collect();
        Self { entries }
    }

    /// Parse a schema file body
    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        let file: SchemaFile = toml::from_str(content)?;
        let entries = file
            .node
            .into_iter()
            .map(|n| {
                let name_tlv = hex::decode(&n.name).map_err(|source| LoadError::Hex {
                    id: n.id,
                    field: "name",
                    source,
                })?;
                let help_tlv = hex::decode(&n.help).map_err(|source| LoadError::Hex {
                    id: n.id,
                    field: "help",
                    source,
                })?;
                Ok(Descriptor {
                    id: n.id,
                    name_tlv,
                    help_tlv,
                    qualifier: n.qualifier,
                    parent_id: n.parent,
                })
            })
            .collect::<Result<Vec<_>, LoadError>>()?;
        Ok(Self { entries })
    }

    /// Load a schema file from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let table = Self::from_toml_str(&content)?;
        info!(
            path = %path.as_ref().display(),
            entries = table.len(),
            "descriptor table loaded"
        );
        Ok(table)
    }

    /// Render as a schema file body
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        let file = SchemaFile {
            node: self
                .entries
                .iter()
                .map(|d| SchemaNode {
                    id: d.id,
                    name: hex::encode(&d.name_tlv),
                    help: hex::encode(&d.help_tlv),
                    qualifier: d.qualifier.clone(),
                    parent: d.parent_id,
                })
                .collect(),
        };
        toml::to_string(&file)
    }

    pub fn entries(&self) -> &[Descriptor] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlv::{decode, NameSegment};

    #[test]
    fn test_all_ids_dense_and_ordered() {
        for (i, id) in TnId::ALL.iter().enumerate() {
            assert_eq!(id.id() as usize, i);
            assert_eq!(BUILTIN[i].id, *id);
        }
        assert_eq!(TnId::from_id(LAST_ID), None);
        assert_eq!(TnId::from_id(15), Some(TnId::DblkRecnum));
    }

    #[test]
    fn test_qualifiers_follow_id() {
        for id in TnId::ALL {
            assert_eq!(id.qualifier(), format!("TN_{}_UQ", id.id()));
        }
        assert_eq!(TnId::Root.qualifier(), UQ_TN_ROOT);
    }

    #[test]
    fn test_builtin_names_decode() {
        let table = DescriptorTable::builtin();
        assert_eq!(table.len(), LAST_ID as usize);
        for d in table.entries() {
            let (_, used) = decode(&d.name_tlv).unwrap();
            assert_eq!(used, d.name_tlv.len(), "node {} has trailing bytes", d.id);
        }
        let sd0 = &table.entries()[TnId::Sd0 as usize];
        assert_eq!(decode(&sd0.name_tlv).unwrap().0, NameSegment::Integer(0));
    }

    #[test]
    fn test_builtin_parents_precede_children() {
        assert_eq!(TnId::Root.parent(), None);
        for id in TnId::ALL.iter().skip(1) {
            let parent = id.parent().unwrap();
            assert!(parent < *id);
        }
    }

    #[test]
    fn test_schema_file_round_trip() {
        let table = DescriptorTable::builtin();
        let text = table.to_toml_string().unwrap();
        let loaded = DescriptorTable::from_toml_str(&text).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_schema_file_bad_hex() {
        let text = r#"
            [[node]]
            id = 0
            name = "01zz"
            help = "010468656c70"
        "#;
        let err = DescriptorTable::from_toml_str(text).unwrap_err();
        assert!(matches!(err, LoadError::Hex { id: 0, field: "name", .. }));
    }

    #[test]
    fn test_schema_file_defaults() {
        let text = r#"
            [[node]]
            id = 0
            name = "0104726f6f74"
            help = "010468656c70"
        "#;
        let table = DescriptorTable::from_toml_str(text).unwrap();
        let root = &table.entries()[0];
        assert_eq!(root.parent_id, None);
        assert!(root.qualifier.is_empty());
        assert_eq!(root.name_tlv, b"\x01\x04root".to_vec());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.toml");
        std::fs::write(&path, DescriptorTable::builtin().to_toml_string().unwrap()).unwrap();
        let table = DescriptorTable::from_file(&path).unwrap();
        assert_eq!(table.len(), 40);
    }

    #[test]
    fn test_from_file_missing() {
        let err = DescriptorTable::from_file("/nonexistent/schema.toml").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
