use std::fs;
use std::path::Path;

use lab_accounts::system::{DirectoryReader, EtcFiles, LiveDirectory};

const PASSWD: &str = "\
root:x:0:0:root:/root:/bin/bash
alice:x:1000:1000:Alice A,Room 4,,,:/home/alice:/bin/bash
mallory:x:1000:1000::/home/mallory:/bin/sh
";

const GROUP: &str = "\
root:x:0:
alice:x:1000:
audio:x:29:alice,ghost
";

const SHELLS: &str = "\
# /etc/shells: valid login shells
/bin/sh
/bin/bash
";

fn write_etc(dir: &Path, shadow: Option<&str>) {
    fs::write(dir.join("passwd"), PASSWD).unwrap();
    fs::write(dir.join("group"), GROUP).unwrap();
    fs::write(dir.join("shells"), SHELLS).unwrap();
    if let Some(shadow) = shadow {
        fs::write(dir.join("shadow"), shadow).unwrap();
    }
}

#[test]
fn snapshot_is_read_from_etc_files() {
    let dir = tempfile::tempdir().unwrap();
    write_etc(dir.path(), Some("alice:$6$x$y:19000:0:90:7:::\n"));

    let live = LiveDirectory::load(Box::new(EtcFiles::in_dir(dir.path()))).unwrap();
    let accounts = live.accounts();
    let alice = accounts.user_by_name("alice").unwrap();
    assert_eq!(alice.primary_group.as_deref(), Some("alice"));
    assert_eq!(alice.groups(), ["audio"]);
    assert_eq!(alice.password.as_deref(), Some("$6$x$y"));
    assert_eq!(alice.max, Some(90));
    assert_eq!(alice.gecos.office, "Room 4");
    assert_eq!(live.shells(), ["/bin/sh", "/bin/bash"]);
    assert!(live.is_valid_shell("/bin/bash"));
    assert!(!live.is_valid_shell("/bin/zsh"));
}

#[test]
fn second_entry_with_a_taken_uid_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_etc(dir.path(), None);

    let accounts = EtcFiles::in_dir(dir.path()).read_accounts().unwrap();
    assert_eq!(accounts.user_count(), 2);
    assert!(accounts.user_by_name("mallory").is_none());
    assert_eq!(accounts.user_by_uid(1000).unwrap().name(), "alice");
}

#[test]
fn missing_shadow_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    write_etc(dir.path(), None);

    let accounts = EtcFiles::in_dir(dir.path()).read_accounts().unwrap();
    let alice = accounts.user_by_name("alice").unwrap();
    assert_eq!(alice.password.as_deref(), Some("x"));
    assert_eq!(alice.lstchg, None);
}

#[test]
fn missing_passwd_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EtcFiles::in_dir(dir.path()).read_accounts().unwrap_err();
    assert!(err.is_io_error());
}

#[test]
fn refresh_picks_up_new_accounts() {
    let dir = tempfile::tempdir().unwrap();
    write_etc(dir.path(), None);
    let mut live = LiveDirectory::load(Box::new(EtcFiles::in_dir(dir.path()))).unwrap();
    assert!(live.accounts().user_by_name("bob").is_none());

    let passwd = format!("{PASSWD}bob:x:1001:1001::/home/bob:/bin/bash\n");
    fs::write(dir.path().join("passwd"), passwd).unwrap();
    live.refresh().unwrap();
    assert!(live.accounts().user_by_name("bob").is_some());
}

#[test]
fn group_member_lists_never_abort_the_read() {
    let dir = tempfile::tempdir().unwrap();
    write_etc(dir.path(), None);
    let group = format!("{GROUP}video:x:44:ghost,alice,alice\n");
    fs::write(dir.path().join("group"), group).unwrap();

    let accounts = EtcFiles::in_dir(dir.path()).read_accounts().unwrap();
    let alice = accounts.user_by_name("alice").unwrap();
    assert_eq!(alice.groups(), ["audio", "video"]);
    let video = accounts.group_by_name("video").unwrap().id();
    assert_eq!(accounts.supplementary_members(video).len(), 1);
}
