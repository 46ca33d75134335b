use lab_accounts::Config;

use crate::helpers::*;

#[test]
fn missing_fields_get_defaults() {
    let live = bob_live();
    let staging = stage_csv(&live, &Config::default(), "Username\nalice\n");
    let alice = staged(&staging, "alice");

    assert_eq!(alice.directory.as_deref(), Some("/home/alice"));
    assert_eq!(alice.uid, Some(1001));
    assert_eq!(alice.primary_group.as_deref(), Some("alice"));
    assert_eq!(alice.gid, Some(1001));
    assert_eq!(alice.shell.as_deref(), Some("/bin/bash"));
    assert_eq!(alice.lstchg, Some(TODAY));
    assert_eq!(alice.min, Some(0));
    assert_eq!(alice.max, Some(99999));
    assert_eq!(alice.warn, Some(7));
    assert_eq!(alice.inact, Some(-1));
    assert_eq!(alice.expire, Some(-1));
    assert_eq!(alice.password.as_deref(), Some("!"));

    let private = staging.group_by_name("alice").expect("private group stub");
    assert_eq!(private.gid, Some(1001));
}

#[test]
fn uids_are_unique_within_the_batch() {
    let live = bob_live();
    let staging = stage_csv(&live, &Config::default(), "Username,UID\na,\nb,1002\nc,\n");
    let uids: Vec<Option<u32>> = staging.users().map(|u| u.uid).collect();
    assert_eq!(uids, [Some(1001), Some(1002), Some(1003)]);
}

#[test]
fn private_gid_falls_back_when_uid_is_taken_as_gid() {
    let live = bob_live();
    // gid 1000 is bob's group, so erin cannot get gid == uid
    let staging = stage_csv(&live, &Config::default(), "Username,UID\nerin,1000\n");
    let erin = staged(&staging, "erin");
    assert_eq!(erin.uid, Some(1000));
    assert_eq!(erin.gid, Some(1001));
}

#[test]
fn primary_group_follows_live_gid() {
    let live = bob_live();
    let staging = stage_csv(&live, &Config::default(), "Username,GID\nfred,2001\n");
    let fred = staged(&staging, "fred");
    assert_eq!(fred.primary_group.as_deref(), Some("teachers"));
    assert!(staging.group_by_name("teachers").is_none());
    assert!(staging.group_by_name("fred").is_none());
}

#[test]
fn declared_primary_group_takes_live_gid() {
    let live = bob_live();
    let staging = stage_csv(&live, &Config::default(), "Username,Primary group\ngail,teachers\n");
    assert_eq!(staged(&staging, "gail").gid, Some(2001));
}

#[test]
fn plaintext_password_is_encrypted() {
    let live = bob_live();
    let staging = stage_csv(
        &live,
        &Config::default(),
        "Username,Encrypted password,Password\nhal,$6$old,s3cret\nivy,$6$kept,\n",
    );
    assert_eq!(staged(&staging, "hal").password.as_deref(), Some("$plain$s3cret"));
    assert_eq!(staged(&staging, "ivy").password.as_deref(), Some("$6$kept"));
}

#[test]
fn supplied_values_are_kept_even_if_invalid() {
    let live = bob_live();
    let staging = stage_csv(
        &live,
        &Config::default(),
        "Username,Shell,Maximum password age\nJack,/bin/fish,-5\n",
    );
    let jack = staged(&staging, "Jack");
    assert_eq!(jack.shell.as_deref(), Some("/bin/fish"));
    assert_eq!(jack.max, Some(-5));
}

#[test]
fn home_base_comes_from_config() {
    let live = bob_live();
    let config = Config {
        home_base: "/srv/students".into(),
        ..Config::default()
    };
    let staging = stage_csv(&live, &config, "Username\nkate\n");
    assert_eq!(staged(&staging, "kate").directory.as_deref(), Some("/srv/students/kate"));
}

#[test]
fn group_stubs_merge_across_rows() {
    let live = bob_live();
    let staging = stage_csv(
        &live,
        &Config::default(),
        "Username,Groups\nlia,\"lab:3000,audio\"\nmo,lab\n",
    );
    let lab = staging.group_by_name("lab").unwrap();
    assert_eq!(lab.gid, Some(3000));
    let members: Vec<&str> = staging
        .supplementary_members(lab.id())
        .iter()
        .map(|u| u.name())
        .collect();
    assert_eq!(members, ["lia", "mo"]);
    assert_eq!(staging.group_by_name("audio").unwrap().members().len(), 1);
}
