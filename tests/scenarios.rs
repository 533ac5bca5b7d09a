mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use romkit::fields::{MetaValue, Property};
use romkit::registry::FileType;
use romkit::romdata::{Options, State};
use romkit::{ByteSource, Error, RomData};

#[test]
fn nsf_header_decodes_addresses() {
    let rom = RomData::new(ByteSource::from_vec(common::nsf()), Some("song.nsf"));
    assert!(rom.is_valid());
    assert_eq!(rom.format_name(), Some("NSF"));
    assert_eq!(rom.file_type(), FileType::AudioFile);
    assert_eq!(rom.state(), State::FieldsPending);

    let fields = rom.fields();
    for (name, addr) in [
        ("Load Address", 0x8000),
        ("Init Address", 0x8010),
        ("Play Address", 0x8020),
    ] {
        assert_eq!(fields.find(name).and_then(|f| f.as_unsigned()), Some(addr), "{name}");
    }
    assert_eq!(fields.find("Load Address").unwrap().value().to_string(), "0x8000");
    assert_eq!(
        rom.metadata().get(Property::Title),
        Some(&MetaValue::String("Underworld".into()))
    );
    assert_eq!(rom.state(), State::FieldsLoaded);
}

#[test]
fn truncated_nsf_is_recognized_but_invalid() {
    let data = common::nsf()[..64].to_vec();
    let rom = RomData::new(ByteSource::from_vec(data), None);
    assert!(rom.is_recognized());
    assert!(!rom.is_valid());
    assert_eq!(rom.state(), State::Invalid);
    assert!(matches!(rom.error(), Some(Error::TopLevelInvalid { format: "NSF", .. })));
    assert!(rom.error().is_some_and(Error::is_truncation));
    assert!(rom.fields().is_empty());
    assert!(rom.metadata().is_empty());
    assert_eq!(rom.file_type(), FileType::Unknown);
}

#[test]
fn xdbf_bad_string_table_drops_only_the_title() {
    let rom = RomData::new(ByteSource::from_vec(common::xdbf("Halo", true)), None);
    assert!(rom.is_valid());
    assert_eq!(rom.format_name(), Some("XDBF"));

    let fields = rom.fields();
    assert!(fields.find("Title").is_none());
    assert!(fields.find("Title ID").is_some());
    assert!(fields.find("Default Language").is_some());

    let degraded = rom.degradations();
    assert_eq!(degraded.len(), 1);
    assert_eq!(degraded[0].record(), "XSTR");
    assert!(matches!(degraded[0].error, Error::SubRecordInvalid { .. }));
    assert!(rom.is_valid());
}

#[test]
fn xdbf_good_string_table_has_title() {
    let rom = RomData::new(ByteSource::from_vec(common::xdbf("Halo", false)), Some("title.spa"));
    assert_eq!(rom.fields().find("Title").and_then(|f| f.as_str()), Some("Halo"));
    assert!(rom.degradations().is_empty());
    assert_eq!(rom.file_type(), FileType::ResourceLibrary);

    let gpd = RomData::new(ByteSource::from_vec(common::xdbf("Halo", false)), Some("PROFILE.GPD"));
    assert_eq!(gpd.file_type(), FileType::SaveFile);
}

#[test]
fn engines_on_sub_ranges_outlive_the_parent() {
    let mut data = common::nsf();
    data.resize(0x100, 0);
    let xdbf = common::xdbf("Shared", false);
    let xdbf_len = xdbf.len() as u64;
    data.extend_from_slice(&xdbf);

    let (parent, drops) = common::counted(data);
    let a = RomData::new(parent.sub_range(0, 0x80).unwrap(), None);
    let b = RomData::new(parent.sub_range(0x100, xdbf_len).unwrap(), None);
    parent.release();
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    assert_eq!(a.format_name(), Some("NSF"));
    assert_eq!(b.format_name(), Some("XDBF"));
    assert_eq!(a.fields().find("Title").and_then(|f| f.as_str()), Some("Underworld"));
    assert_eq!(b.fields().find("Title").and_then(|f| f.as_str()), Some("Shared"));

    drop(a);
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    drop(b);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn unrecognized_file_is_empty() {
    let rom = RomData::new(ByteSource::from_slice(b"just some text, nothing more"), Some("a.nsf"));
    assert!(!rom.is_recognized());
    assert!(!rom.is_valid());
    assert_eq!(rom.state(), State::Unrecognized);
    assert!(rom.fields().is_empty());
    assert!(rom.error().is_none());
    assert!(rom.supported_extensions().is_empty());
}

#[test]
fn file_shorter_than_min_size_is_not_claimed() {
    let mut data = b"WUP-P-ARPE-00-V550-E-D1".to_vec();
    data.resize(0x1000, 0);
    let rom = RomData::new(ByteSource::from_vec(data), Some("disc.wud"));
    assert!(!rom.is_recognized());
}

#[test]
fn extension_hint_cannot_override_magic() {
    let rom = RomData::new(ByteSource::from_vec(common::nsf()), Some("misnamed.xdbf"));
    assert_eq!(rom.format_name(), Some("NSF"));
}

#[test]
fn wii_u_needs_secondary_magic() {
    let mut data = b"WUP-P-ARPE-00-V550-E-D1".to_vec();
    data.resize(0x10004, 0);
    let rom = RomData::new(ByteSource::from_vec(data.clone()), None);
    assert!(rom.is_recognized());
    assert!(!rom.is_valid());
    assert!(rom.error().is_some_and(Error::is_bad_magic));

    data[0x10000..].copy_from_slice(&0xCC54_9EB9u32.to_be_bytes());
    let rom = RomData::new(ByteSource::from_vec(data), None);
    assert!(rom.is_valid());
    assert_eq!(rom.file_type(), FileType::DiscImage);
    assert_eq!(rom.fields().find("OS Version").and_then(|f| f.as_str()), Some("5.5.0"));
}

#[test]
fn nasos_header() {
    let mut data = vec![0u8; 0x18];
    data[..4].copy_from_slice(b"GCML");
    data[4..8].copy_from_slice(b"GZLE");
    let rom = RomData::new(ByteSource::from_vec(data), Some("zelda.iso.dec"));
    assert_eq!(rom.format_name(), Some("NASOS"));
    assert_eq!(rom.fields().find("Game ID").and_then(|f| f.as_str()), Some("GZLE"));
    assert_eq!(rom.fields().find("Block Count").and_then(|f| f.as_unsigned()), Some(712_880));
}

#[test]
fn custom_registry_replaces_builtin() {
    let mut registry = romkit::Registry::new();
    registry.register(romkit::formats::xdbf::DESCRIPTOR);
    let options = Options {
        registry: Some(Arc::new(registry)),
        tracker: None,
        ..Options::default()
    };
    let rom = RomData::with_options(ByteSource::from_vec(common::nsf()), None, options);
    assert!(!rom.is_recognized());
}
