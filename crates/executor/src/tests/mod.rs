//! Test modules for the executor crate.

pub mod dispatch;

use crate::{Command, IndexDefinition};
use serde_json::json;

/// Commands that load one contact sphere and `n` masks linking to it.
pub(crate) fn seed_masks(n: usize) -> Vec<Command> {
    let mut cmds = vec![Command::Put {
        key: "ContactSpheres-1".into(),
        collection: "ContactSpheres".into(),
        body: json!({"Acl": ["users/2"]}),
    }];
    for i in 1..=n {
        cmds.push(Command::Put {
            key: format!("SocialMasks-{}", i),
            collection: "SocialMasks".into(),
            body: json!({"Spheres": [
                {"Id": "ContactSpheres-1", "Acl": []},
                {"Id": "ContactSpheres-2", "Acl": []}
            ]}),
        });
    }
    cmds
}

/// Index masks by the spheres they link to.
pub(crate) fn scope_index() -> Command {
    Command::CreateIndex {
        definition: IndexDefinition::link_ids("ScopeIndex", &["SocialMasks"], "Spheres"),
    }
}

pub(crate) const PUSH_TO_SPHERE: &str =
    "this.Spheres.map(l => if l.Id == sphereId { l.Acl.push(friend) })";
