// SPDX-License-Identifier: AGPL-3.0-only

//! WGSL shader sources for the simulation step.
//!
//! Three passes, encoded into one command encoder and submitted once per
//! step. All three share the same `Params` uniform layout, mirrored on
//! the host by [`crate::sim::kernel::StepParams`].

// ═══════════════════════════════════════════════════════════════════
// Lennard-Jones All-Pairs Force Pass (f32)
// ═══════════════════════════════════════════════════════════════════
//
// Each thread handles one particle, loops over all others within the
// cutoff. O(N²) — the active set of this system stays in the low
// thousands. Adds the optional depth-field gradient bias and clamps the
// total force magnitude.

pub const SHADER_LJ_FORCE: &str = include_str!("shaders/lj_force.wgsl");

// ═══════════════════════════════════════════════════════════════════
// Semi-Implicit Euler Integration + Thermostat Scale (f32)
// ═══════════════════════════════════════════════════════════════════
//
// v += f/m·dt, Berendsen rescale by a host-computed uniform scalar,
// x += v·dt, reflective world bounds.

pub const SHADER_INTEGRATE: &str = include_str!("shaders/integrate.wgsl");

// ═══════════════════════════════════════════════════════════════════
// Collision Recording Pass (f32, atomic claim-a-slot)
// ═══════════════════════════════════════════════════════════════════
//
// Pairs (i, j), i < j, within contact distance append to the bounded
// collision buffer via atomicAdd on the header counter. Events past
// capacity are counted but not stored.

pub const SHADER_COLLIDE: &str = include_str!("shaders/collide.wgsl");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_shaders_declare_main_entry() {
        for (name, src) in [
            ("lj_force", SHADER_LJ_FORCE),
            ("integrate", SHADER_INTEGRATE),
            ("collide", SHADER_COLLIDE),
        ] {
            assert!(src.contains("fn main"), "{name} missing entry point");
            assert!(src.contains("@workgroup_size(64)"), "{name} workgroup size");
        }
    }

    #[test]
    fn shared_params_struct_is_identical_across_passes() {
        let extract = |src: &str| -> String {
            let start = src.find("struct Params").expect("Params struct");
            let end = src[start..].find('}').expect("closing brace") + start;
            src[start..=end].to_string()
        };
        let a = extract(SHADER_LJ_FORCE);
        assert_eq!(a, extract(SHADER_INTEGRATE));
        assert_eq!(a, extract(SHADER_COLLIDE));
    }

    #[test]
    fn collide_uses_atomic_append() {
        assert!(SHADER_COLLIDE.contains("atomicAdd"));
        assert!(SHADER_COLLIDE.contains("slot < params.max_collisions"));
    }
}
