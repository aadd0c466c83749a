//! End-to-end tests running the emberctl binary on generated fixtures.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use ember_acpi::aml::{AmlTree, TableIds, pkglen};
use ember_acpi::sdt::update_checksum;
use ember_binparse::AsBytes;
use ember_prm::{ExportDescriptor, PrmHandlerExportDescriptor, PrmModuleExportDescriptor};
use ember_transfer_list::{TransferList, TransferListBuilder, tag};
use ember_uefi::EfiGuid;

/// A scratch directory unique to one test.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("emberctl-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("failed to create scratch directory");
    dir
}

fn emberctl(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_emberctl"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to execute emberctl")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "emberctl failed (exit={:?}):\nstdout:\n{}\nstderr:\n{}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_transfer_list(path: &Path) {
    let mut buf = vec![0u8; 0x200];
    let mut builder = TransferListBuilder::init(&mut buf, 3).unwrap();
    builder.add_entry(tag::FDT, b"fake device tree").unwrap();
    builder.add_entry(tag::HOB_LIST, &[0xAA; 12]).unwrap();
    let _ = builder.finish();
    fs::write(path, &buf).unwrap();
}

fn write_ssdt(path: &Path) {
    let mut tree = AmlTree::definition_block(TableIds {
        signature: *b"SSDT",
        oem_id: *b"EMBER ",
        oem_table_id: *b"CLITEST ",
        oem_revision: 1,
    })
    .unwrap();
    let sb = tree.code_gen_scope("\\_SB", Some(AmlTree::ROOT)).unwrap();
    let dev = tree.code_gen_device("COM0", Some(sb)).unwrap();
    tree.code_gen_name_resource_template("_CRS", Some(dev)).unwrap();
    tree.code_gen_name_integer("_UID", 1, Some(dev)).unwrap();
    fs::write(path, tree.serialize().unwrap()).unwrap();
}

#[test]
fn tl_dump_verify_extract() {
    let dir = scratch("tl");
    write_transfer_list(&dir.join("list.bin"));

    let out = emberctl(&dir, &["tl", "verify", "list.bin"]);
    assert_success(&out);
    assert!(stdout(&out).contains("2 entries"));

    let out = emberctl(&dir, &["tl", "dump", "list.bin"]);
    assert_success(&out);
    assert!(stdout(&out).contains("HOB_LIST"), "{}", stdout(&out));

    let out = emberctl(&dir, &["tl", "extract", "list.bin", "--tag", "1", "-o", "fdt.bin"]);
    assert_success(&out);
    assert_eq!(fs::read(dir.join("fdt.bin")).unwrap(), b"fake device tree");

    let out = emberctl(&dir, &["tl", "extract", "list.bin", "--tag", "0x7", "-o", "x.bin"]);
    assert!(!out.status.success());
}

#[test]
fn tl_verify_rejects_corruption() {
    let dir = scratch("tl-bad");
    let path = dir.join("list.bin");
    write_transfer_list(&path);
    let mut data = fs::read(&path).unwrap();
    data[30] ^= 0x55;
    fs::write(&path, data).unwrap();

    let out = emberctl(&dir, &["-q", "tl", "verify", "list.bin"]);
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn tl_build_uses_config_alignment() {
    let dir = scratch("tl-build");
    fs::write(dir.join("payload.bin"), [1, 2, 3]).unwrap();
    fs::write(
        dir.join("emberctl.toml"),
        "[transfer-list]\nalignment = 4\nmax-size = 256\n",
    )
    .unwrap();

    let out = emberctl(
        &dir,
        &["tl", "build", "--entry", "1=payload.bin", "--entry", "0x3=payload.bin", "-o", "new.bin"],
    );
    assert_success(&out);

    let data = fs::read(dir.join("new.bin")).unwrap();
    assert_eq!(data.len(), 256);
    let list = TransferList::new(&data).unwrap();
    assert_eq!(list.header().alignment, 4);
    let offsets: Vec<usize> = list.entries().map(|e| e.offset()).collect();
    assert_eq!(offsets.len(), 2);
    assert!(offsets.iter().all(|o| o % 16 == 0));
}

#[test]
fn aml_set_int_and_add_interrupt() {
    let dir = scratch("aml");
    write_ssdt(&dir.join("ssdt.aml"));

    let out = emberctl(&dir, &["aml", "dump", "ssdt.aml", "--verify"]);
    assert_success(&out);
    assert!(stdout(&out).contains("Device"), "{}", stdout(&out));

    let out = emberctl(
        &dir,
        &["aml", "set-int", "ssdt.aml", "\\_SB.COM0._UID", "0x1234", "-o", "uid.aml"],
    );
    assert_success(&out);

    let out = emberctl(
        &dir,
        &["aml", "add-interrupt", "uid.aml", "\\_SB.COM0._CRS", "4", "5", "--edge", "-o", "irq.aml"],
    );
    assert_success(&out);

    let tree = AmlTree::parse(&fs::read(dir.join("irq.aml")).unwrap()).unwrap();
    assert_eq!(tree.verify_sizes(), Ok(None));
    let uid = tree.find_node(AmlTree::ROOT, "\\_SB.COM0._UID").unwrap();
    let value = tree.fixed_arg(uid, 1).unwrap();
    assert_eq!(tree.integer_value(value), Ok(0x1234));

    let crs = tree.find_node(AmlTree::ROOT, "\\_SB.COM0._CRS").unwrap();
    let rd = tree.name_op_first_rd(crs).unwrap().unwrap();
    // Extended Interrupt: tag 0x89, consumer and edge flags, two interrupts.
    assert_eq!(&tree.data(rd).unwrap().bytes[..5], &[0x89, 0x0A, 0x00, 0x03, 0x02]);
}

#[test]
fn aml_config_stamps_header() {
    let dir = scratch("aml-config");
    write_ssdt(&dir.join("ssdt.aml"));
    fs::write(
        dir.join("patch.toml"),
        "[aml]\noem-table-id = \"PATCHED\"\noem-revision = 9\ncompliance = true\n",
    )
    .unwrap();

    let out = emberctl(
        &dir,
        &["--config", "patch.toml", "aml", "set-int", "ssdt.aml", "\\_SB.COM0._UID", "2", "-o", "out.aml"],
    );
    assert_success(&out);

    let table = fs::read(dir.join("out.aml")).unwrap();
    assert_eq!(&table[16..24], b"PATCHED ");
    assert_eq!(u32::from_le_bytes(table[24..28].try_into().unwrap()), 9);
    assert_eq!(table.iter().fold(0u8, |s, &b| s.wrapping_add(b)), 0);
}

#[test]
fn aml_missing_path_fails() {
    let dir = scratch("aml-missing");
    write_ssdt(&dir.join("ssdt.aml"));
    let out = emberctl(
        &dir,
        &["aml", "set-int", "ssdt.aml", "\\_SB.NOPE._UID", "1", "-o", "out.aml"],
    );
    assert!(!out.status.success());
    assert!(!dir.join("out.aml").exists());
}

/// An SSDT holding `Name(PKG0, Package(1) { Package(1) { ... } })` with
/// `levels` Packages.
fn deep_ssdt(levels: usize) -> Vec<u8> {
    let mut headers = Vec::with_capacity(levels);
    let mut inner = 0;
    for i in 0..levels {
        let total = pkglen::total_for_content(1 + inner).unwrap();
        let (len, width) = pkglen::encode(total).unwrap();
        let mut header = vec![0x12];
        header.extend_from_slice(&len[..width]);
        header.push(u8::from(i > 0));
        inner += header.len();
        headers.push(header);
    }

    let mut table = vec![0u8; 36];
    table[..4].copy_from_slice(b"SSDT");
    table[8] = 2;
    table.extend_from_slice(b"\x08PKG0");
    for header in headers.iter().rev() {
        table.extend_from_slice(header);
    }
    let len = table.len() as u32;
    table[4..8].copy_from_slice(&len.to_le_bytes());
    update_checksum(&mut table);
    table
}

#[test]
fn aml_dump_rejects_deep_nesting() {
    let dir = scratch("aml-deep");
    fs::write(dir.join("deep.aml"), deep_ssdt(20_000)).unwrap();

    let out = emberctl(&dir, &["aml", "dump", "deep.aml"]);
    assert_eq!(out.status.code(), Some(1), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stderr).contains("malformed AML"));
}

#[test]
fn prm_dump_descriptor() {
    static EXPORT: PrmModuleExportDescriptor<1> = PrmModuleExportDescriptor::new(
        EfiGuid::new(0x1111_2222, 0x3333, 0x4444, [5; 8]),
        EfiGuid::new(0x6666_7777, 0x8888, 0x9999, [0xA; 8]),
        [PrmHandlerExportDescriptor::new(
            EfiGuid::new(1, 2, 3, [4; 8]),
            "DumpAddressTranslation",
        )],
    );
    let dir = scratch("prm");
    fs::write(dir.join("medt.bin"), EXPORT.as_bytes()).unwrap();
    assert!(ExportDescriptor::parse(EXPORT.as_bytes()).is_ok());

    let out = emberctl(&dir, &["prm", "dump", "medt.bin"]);
    assert_success(&out);
    let text = stdout(&out);
    assert!(text.contains("DumpAddressTranslation"), "{text}");
    assert!(text.contains("handlers      1"), "{text}");

    fs::write(dir.join("junk.bin"), [0u8; 16]).unwrap();
    let out = emberctl(&dir, &["prm", "dump", "junk.bin"]);
    assert!(!out.status.success());
}
