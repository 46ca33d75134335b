use lab_accounts::{
    AccountSet, Config, Field, Group, User,
    conflict::{DetectContext, Diagnosis, Expected, RowStatus, detect_conflicts},
};

use crate::helpers::*;

/// A staged user that passes every check against `bob_live`.
fn clean(name: &str, uid: u32) -> User {
    complete_user(name, uid)
}

fn staging_with(groups: Vec<Group>, users: Vec<User>) -> AccountSet {
    let mut set = AccountSet::staging();
    for group in groups {
        set.add_group(group, []).unwrap();
    }
    for user in users {
        set.add_user(user).unwrap();
    }
    set
}

#[test]
fn clean_batch_can_be_applied() {
    let live = bob_live();
    let staging = staging_with(
        vec![Group::new("ann", Some(1500))],
        vec![clean("ann", 1500)],
    );
    let report = detect(&staging, &live, &FakeProbe::default());
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].status, RowStatus::Ok);
    assert!(report.rows[0].tags.is_empty());
    assert!(report.can_apply());
}

#[test]
fn syntax_violations_are_tagged_char() {
    let live = bob_live();
    let mut user = clean("Bad.Name", 1500)
        .with_primary_group("9group")
        .with_shell("/bin/fish")
        .with_groups(["ok", "Not-OK"]);
    user.gecos.office = "Room 1, east".to_string();
    user.gecos.other = "a:b".to_string();
    user.max = Some(-2);
    user.expire = Some(i64::from(i32::MAX) + 1);
    let staging = staging_with(
        vec![Group::new("ok", None), Group::new("Not-OK", None)],
        vec![user],
    );

    let report = detect(&staging, &live, &FakeProbe::default());
    let row = &report.rows[0];
    for field in [
        Field::Name,
        Field::PrimaryGroup,
        Field::Office,
        Field::Other,
        Field::Shell,
        Field::Groups,
        Field::MaxAge,
        Field::Expire,
    ] {
        assert_eq!(row.tags.get(field), Some(&Diagnosis::Char), "{field}");
    }
    assert_eq!(row.tags.get(Field::RealName), None);
    assert_eq!(row.tags.get(Field::MinAge), None);
    assert_eq!(row.status, RowStatus::Error);
}

#[test]
fn aging_bounds_are_inclusive() {
    let live = bob_live();
    let mut user = clean("cy", 1500);
    user.inact = Some(-1);
    user.max = Some(i64::from(i32::MAX));
    let staging = staging_with(vec![], vec![user]);
    assert!(detect(&staging, &live, &FakeProbe::default()).can_apply());
}

#[test]
fn missing_ids_are_char() {
    let live = bob_live();
    let mut user = clean("dee", 1500);
    user.uid = None;
    user.gid = None;
    user.directory = None;
    let staging = staging_with(vec![], vec![user]);
    let report = detect(&staging, &live, &FakeProbe::default());
    for field in [Field::Uid, Field::Gid, Field::Directory] {
        assert_eq!(report.rows[0].tags.get(field), Some(&Diagnosis::Char));
    }
}

#[test]
fn char_is_never_overwritten() {
    let live = bob_live();
    // The gid belongs to live `teachers`, which would otherwise be a mismatch
    let mut kai = clean("kai", 1500);
    kai.gid = Some(2001);
    kai.primary_group = Some("Staff!".to_string());
    let staging = staging_with(vec![], vec![kai]);
    let report = detect(&staging, &live, &FakeProbe::default());
    assert_eq!(
        report.rows[0].tags.get(Field::PrimaryGroup),
        Some(&Diagnosis::Char)
    );
}

#[test]
fn later_checks_replace_earlier_ones() {
    let live = bob_live();
    let staging = staging_with(
        vec![Group::new("lou", Some(1000))],
        vec![clean("lou", 1000), clean("mia", 1000)],
    );
    let report = detect(&staging, &live, &FakeProbe::default());
    // dup on the second row, but con wins
    assert_eq!(report.rows[1].tags.get(Field::Uid), Some(&Diagnosis::Con));
}

#[test]
fn live_name_collision_is_con() {
    let live = bob_live();
    let mut bob = complete_user("bob", 1700).with_directory("/home/bob2");
    bob.gid = Some(1000);
    let staging = staging_with(vec![], vec![bob]);
    let report = detect(&staging, &live, &FakeProbe::default());
    let row = &report.rows[0];
    assert_eq!(row.tags.get(Field::Name), Some(&Diagnosis::Con));
    assert_eq!(row.tags.get(Field::Uid), None);
}

#[test]
fn dup_is_only_reported_on_later_rows() {
    let live = bob_live();
    let staging = staging_with(
        vec![Group::new("eve", Some(1500))],
        vec![
            clean("eve", 1500),
            clean("fay", 1500).with_directory("/home/eve"),
        ],
    );
    let report = detect(&staging, &live, &FakeProbe::default());
    assert!(report.rows[0].tags.is_empty());
    let second = &report.rows[1].tags;
    assert_eq!(second.get(Field::Uid), Some(&Diagnosis::Dup));
    assert_eq!(second.get(Field::Directory), Some(&Diagnosis::Dup));
    assert_eq!(second.get(Field::Name), None);
}

#[test]
fn shared_gid_is_flagged_only_when_configured() {
    let live = bob_live();
    let mut fay = clean("fay", 1501);
    fay.gid = Some(1500);
    fay.primary_group = Some("eve".to_string());
    let staging = staging_with(
        vec![Group::new("eve", Some(1500))],
        vec![clean("eve", 1500), fay],
    );
    let probe = FakeProbe::default();

    let report = detect(&staging, &live, &probe);
    assert!(report.can_apply());

    let config = Config {
        flag_shared_gid: true,
        ..Config::default()
    };
    let report = detect_conflicts(&staging, &DetectContext::new(&live, &probe, &config));
    assert_eq!(report.rows[1].tags.get(Field::Gid), Some(&Diagnosis::Dup));
}

#[test]
fn gid_owned_by_another_live_group_is_a_name_mismatch() {
    let live = bob_live();
    let mut gus = clean("gus", 1500);
    gus.gid = Some(2001);
    gus.primary_group = Some("gus".to_string());
    let staging = staging_with(vec![Group::new("gus", None)], vec![gus]);
    let report = detect(&staging, &live, &FakeProbe::default());
    assert_eq!(
        report.rows[0].tags.get(Field::PrimaryGroup),
        Some(&Diagnosis::Mismatch {
            expected: Expected::Group("teachers".to_string())
        })
    );
    assert_eq!(report.rows[0].tags.get(Field::Gid), None);
}

#[test]
fn home_owned_by_the_same_ids_is_not_a_hijack() {
    let live = bob_live();
    let probe = FakeProbe::default().with_owner("/home/hal", 1500, 1500);
    let staging = staging_with(vec![Group::new("hal", Some(1500))], vec![clean("hal", 1500)]);
    assert!(detect(&staging, &live, &probe).can_apply());
}

#[test]
fn gid_only_hijack_tags_gid_and_directory() {
    let live = bob_live();
    let probe = FakeProbe::default().with_owner("/home/ian", 1500, 7);
    let staging = staging_with(vec![Group::new("ian", Some(1500))], vec![clean("ian", 1500)]);
    let report = detect(&staging, &live, &probe);
    let tags = &report.rows[0].tags;
    assert_eq!(tags.get(Field::Uid), None);
    assert!(matches!(tags.get(Field::Gid), Some(Diagnosis::Hijack { .. })));
    assert!(matches!(tags.get(Field::Directory), Some(Diagnosis::Hijack { .. })));
}

#[test]
fn probe_failures_are_reported_not_raised() {
    let live = bob_live();
    let probe = FakeProbe::default().failing("/home/jon");
    let staging = staging_with(vec![Group::new("jon", Some(1500))], vec![clean("jon", 1500)]);
    let report = detect(&staging, &live, &probe);
    assert!(report.can_apply());
    assert_eq!(report.probe_failures.len(), 1);
    assert_eq!(report.probe_failures[0].directory, "/home/jon");
}

#[test]
fn identical_users_are_offered_for_removal() {
    let live = bob_live();
    let staging = stage_csv(
        &live,
        &Config::default(),
        "Username,UID,GID,Primary group,Directory,Shell\n\
         bob,1000,1000,bob,/home/bob,/bin/bash\n",
    );
    let report = detect(&staging, &live, &FakeProbe::default());
    let bob = staged(&staging, "bob").id();
    assert_eq!(report.status(bob), Some(RowStatus::Identical));
    assert_eq!(report.identical_users().collect::<Vec<_>>(), [bob]);
    assert!(report.can_apply());
}

#[test]
fn detection_is_deterministic() {
    let live = bob_live();
    let probe = FakeProbe::default().with_owner("/home/dave", 5000, 5000);
    let staging = stage_csv(
        &live,
        &Config::default(),
        "Username,UID,GID,Primary group,Directory\n\
         alice,1000,,,\n\
         carol,,,,\n\
         carol,,,,\n\
         dan,,2000,teachers,\n\
         dave,1500,1500,,/home/dave\n",
    );
    let first = detect(&staging, &live, &probe);
    let second = detect(&staging, &live, &probe);
    assert_eq!(first, second);
    assert_eq!(first.error_rows().count(), 4);
}

#[test]
fn report_serializes_for_the_ui() {
    let live = bob_live();
    let staging = stage_csv(&live, &Config::default(), "Username,UID\nalice,1000\n");
    let report = detect(&staging, &live, &FakeProbe::default());
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["rows"][0]["name"], "alice");
    assert_eq!(json["rows"][0]["status"], "error");
    assert_eq!(json["rows"][0]["tags"]["uid"]["code"], "con");
}

#[test]
fn staged_primary_groups_sharing_a_gid_block_the_batch() {
    let live = bob_live();
    let staging = stage_csv(
        &live,
        &Config::default(),
        "Username,GID,Primary group\n\
         ann,3000,lab\n\
         ben,3000,art\n\
         cid,1000,staff\n",
    );
    let report = detect(&staging, &live, &FakeProbe::default());
    let (ann, ben, cid) = (
        staged(&staging, "ann").id(),
        staged(&staging, "ben").id(),
        staged(&staging, "cid").id(),
    );

    assert_eq!(report.status(ann), Some(RowStatus::Ok));
    assert_eq!(report.tag(ben, Field::Gid), Some(&Diagnosis::Dup));
    assert_eq!(report.tag(cid, Field::Gid), Some(&Diagnosis::Con));
    assert!(!report.can_apply());
}

#[test]
fn supplementary_groups_with_a_taken_gid_are_tagged() {
    let live = bob_live();
    let staging = staging_with(
        vec![
            Group::new("kay", Some(1500)),
            Group::new("lee", Some(1501)),
            Group::new("mo", Some(1502)),
            Group::new("lab", Some(3000)),
            Group::new("art", Some(3000)),
            Group::new("staff", Some(2001)),
        ],
        vec![
            clean("kay", 1500).with_groups(["lab"]),
            clean("lee", 1501).with_groups(["art"]),
            clean("mo", 1502).with_groups(["staff"]),
        ],
    );
    let report = detect(&staging, &live, &FakeProbe::default());
    assert!(report.rows[0].tags.is_empty());
    assert_eq!(report.rows[1].tags.get(Field::Groups), Some(&Diagnosis::Dup));
    assert_eq!(report.rows[1].tags.get(Field::Gid), None);
    assert_eq!(report.rows[2].tags.get(Field::Groups), Some(&Diagnosis::Con));
}

#[test]
fn gid_differing_from_the_staged_primary_group_is_a_mismatch() {
    let live = bob_live();
    let mut oli = clean("oli", 1501);
    oli.gid = Some(1501);
    oli.primary_group = Some("klass".to_string());
    let staging = staging_with(vec![Group::new("klass", Some(3000))], vec![oli]);
    let report = detect(&staging, &live, &FakeProbe::default());
    assert_eq!(
        report.rows[0].tags.get(Field::Gid),
        Some(&Diagnosis::Mismatch {
            expected: Expected::Gid(3000)
        })
    );
}
