//! Fuzz test for tree operations
//!
//! Drives one tree through arbitrary navigation, Data attachment,
//! eviction and shutdown. Nothing may panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nametree_core::{Data, Name, Namespace};

#[derive(Debug, Arbitrary)]
enum Op {
    Descend(Vec<u8>),
    Attach { path: Vec<u8>, fresh_ms: Option<u16> },
    Request { path: Vec<u8>, must_be_fresh: bool },
    Clear(Vec<u8>),
    Shutdown,
}

fn path_name(root: &Name, path: &[u8]) -> Name {
    path.iter()
        .take(4)
        .fold(root.clone(), |name, byte| name.append(vec![byte % 4]))
}

fuzz_target!(|ops: Vec<Op>| {
    let root_name = Name::from_uri("/fuzz").expect("static name");
    let root = Namespace::new(root_name.clone());

    for op in ops.into_iter().take(64) {
        match op {
            Op::Descend(path) => {
                let _ = root.get_descendant(&path_name(&root_name, &path));
            }
            Op::Attach { path, fresh_ms } => {
                let name = path_name(&root_name, &path);
                if let Ok(node) = root.get_descendant(&name) {
                    let mut data = Data::new(name, &b"x"[..]);
                    if let Some(ms) = fresh_ms {
                        data = data.with_meta_info(nametree_core::MetaInfo::with_freshness_period(
                            std::time::Duration::from_millis(u64::from(ms)),
                        ));
                    }
                    let _ = node.set_data(data);
                }
            }
            Op::Request { path, must_be_fresh } => {
                if let Ok(node) = root.get_descendant(&path_name(&root_name, &path)) {
                    let _ = node.object_needed(must_be_fresh);
                }
            }
            Op::Clear(path) => {
                if let Ok(node) = root.get_descendant(&path_name(&root_name, &path)) {
                    node.clear();
                }
            }
            Op::Shutdown => {
                let _ = root.shutdown();
            }
        }
    }
});
