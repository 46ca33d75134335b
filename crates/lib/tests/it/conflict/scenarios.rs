//! The reference scenarios, each run through detection and resolution.

use lab_accounts::{
    Config, Field,
    conflict::{DetectContext, Diagnosis, Expected, RowStatus, resolve_conflicts},
    system::Owner,
};

use crate::helpers::*;

#[test]
fn uid_taken_by_live_user_is_reassigned() {
    let live = bob_live();
    let probe = FakeProbe::default();
    let config = Config::default();
    let mut staging = stage_csv(&live, &config, "Username,UID\nalice,1000\n");
    let alice = staged(&staging, "alice").id();

    let report = detect(&staging, &live, &probe);
    assert_eq!(report.tag(alice, Field::Uid), Some(&Diagnosis::Con));
    assert!(!report.can_apply());

    let ctx = DetectContext::new(&live, &probe, &config);
    let resolution = resolve_conflicts(&mut staging, &report, &ctx).unwrap();
    let uid = staging.user(alice).unwrap().uid.unwrap();
    assert_ne!(uid, 1000);
    assert!(uid >= 1000);
    assert_eq!(uid, 1001);
    assert_eq!(resolution.changes.len(), 1);
    assert_eq!(resolution.changes[0].old, "1000");
    assert_eq!(resolution.changes[0].new, "1001");
    assert!(resolution.report.can_apply());
}

#[test]
fn duplicate_names_are_left_to_the_operator() {
    let live = bob_live();
    let probe = FakeProbe::default();
    let config = Config::default();
    let mut staging = stage_csv(&live, &config, "Username\ncarol\ncarol\n");
    let ids: Vec<_> = staging.users().map(|u| u.id()).collect();

    let report = detect(&staging, &live, &probe);
    assert_eq!(report.tag(ids[0], Field::Name), None);
    assert_eq!(report.tag(ids[1], Field::Name), Some(&Diagnosis::Dup));

    let ctx = DetectContext::new(&live, &probe, &config);
    let resolution = resolve_conflicts(&mut staging, &report, &ctx).unwrap();
    assert_eq!(resolution.report.status(ids[1]), Some(RowStatus::Error));
    assert_eq!(resolution.report.tag(ids[1], Field::Name), Some(&Diagnosis::Dup));
    assert_eq!(staging.user(ids[1]).unwrap().name(), "carol");
    let unresolved: Vec<_> = resolution.unresolved().map(|r| r.user).collect();
    assert_eq!(unresolved, [ids[1]]);
}

#[test]
fn primary_group_gid_mismatch_adopts_live_gid() {
    let live = bob_live();
    let probe = FakeProbe::default();
    let config = Config::default();
    let mut staging = stage_csv(&live, &config, "Username,GID,Primary group\ndan,2000,teachers\n");
    let dan = staged(&staging, "dan").id();

    let report = detect(&staging, &live, &probe);
    let tag = report.tag(dan, Field::Gid).unwrap();
    assert_eq!(
        tag,
        &Diagnosis::Mismatch {
            expected: Expected::Gid(2001)
        }
    );
    assert_eq!(tag.to_string(), "mismatch 2001");

    let ctx = DetectContext::new(&live, &probe, &config);
    let resolution = resolve_conflicts(&mut staging, &report, &ctx).unwrap();
    assert_eq!(staging.user(dan).unwrap().gid, Some(2001));
    assert!(resolution.report.can_apply());
}

#[test]
fn foreign_home_directory_ownership_is_adopted() {
    let live = bob_live();
    let probe = FakeProbe::default().with_owner("/home/dave", 5000, 5000);
    let config = Config::default();
    let mut staging = stage_csv(
        &live,
        &config,
        "Username,UID,GID,Directory\ndave,1500,1500,/home/dave\n",
    );
    let dave = staged(&staging, "dave").id();

    let report = detect(&staging, &live, &probe);
    let hijack = Diagnosis::Hijack {
        owner: Owner {
            uid: 5000,
            gid: 5000,
        },
    };
    assert_eq!(report.tag(dave, Field::Uid), Some(&hijack));
    assert_eq!(report.tag(dave, Field::Gid), Some(&hijack));
    assert_eq!(report.tag(dave, Field::Directory), Some(&hijack));

    let ctx = DetectContext::new(&live, &probe, &config);
    let resolution = resolve_conflicts(&mut staging, &report, &ctx).unwrap();
    let user = staging.user(dave).unwrap();
    assert_eq!((user.uid, user.gid), (Some(5000), Some(5000)));
    assert_eq!(staging.group_by_name("dave").unwrap().gid, Some(5000));
    assert!(resolution.report.can_apply());
}
