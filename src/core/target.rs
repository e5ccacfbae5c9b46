use super::ScalarType;
use crate::error::{PipelineError, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    X86,
    Arm,
    Mips,
    PowerPC,
    Wasm,
    RiscV,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Os {
    Linux,
    Windows,
    OSX,
    Android,
    IOS,
    NoOS,
}

/// Optional code generation features carried by a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Sse41,
    Avx,
    Avx2,
    Avx512,
    Fma,
    F16c,
    Neon,
    Cuda,
    OpenCL,
    Metal,
    Jit,
    Debug,
    NoAsserts,
    NoBoundsQuery,
    LargeBuffers,
    UserContext,
}

const ARCH_NAMES: [(&str, Arch); 6] = [
    ("x86", Arch::X86),
    ("arm", Arch::Arm),
    ("mips", Arch::Mips),
    ("powerpc", Arch::PowerPC),
    ("wasm", Arch::Wasm),
    ("riscv", Arch::RiscV),
];

const OS_NAMES: [(&str, Os); 6] = [
    ("linux", Os::Linux),
    ("windows", Os::Windows),
    ("osx", Os::OSX),
    ("android", Os::Android),
    ("ios", Os::IOS),
    ("noos", Os::NoOS),
];

const FEATURE_NAMES: [(&str, Feature); 16] = [
    ("sse41", Feature::Sse41),
    ("avx", Feature::Avx),
    ("avx2", Feature::Avx2),
    ("avx512", Feature::Avx512),
    ("fma", Feature::Fma),
    ("f16c", Feature::F16c),
    ("neon", Feature::Neon),
    ("cuda", Feature::Cuda),
    ("opencl", Feature::OpenCL),
    ("metal", Feature::Metal),
    ("jit", Feature::Jit),
    ("debug", Feature::Debug),
    ("no_asserts", Feature::NoAsserts),
    ("no_bounds_query", Feature::NoBoundsQuery),
    ("large_buffers", Feature::LargeBuffers),
    ("user_context", Feature::UserContext),
];

fn lookup<T: Copy>(table: &[(&'static str, T)], key: &str) -> Option<T> {
    table.iter().find(|(name, _)| *name == key).map(|(_, v)| *v)
}

fn name_of<T: PartialEq>(table: &[(&'static str, T)], value: &T) -> &'static str {
    table
        .iter()
        .find(|(_, v)| v == value)
        .map(|(name, _)| *name)
        .unwrap_or("unknown")
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(name_of(&ARCH_NAMES, self))
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(name_of(&OS_NAMES, self))
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(name_of(&FEATURE_NAMES, self))
    }
}

/// The compile configuration a pipeline is built for.
///
/// Canonical string form is `arch-bits-os` followed by the feature set in
/// sorted order, e.g. `x86-64-linux-avx-sse41`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub arch: Arch,
    pub bits: u8,
    pub os: Os,
    pub features: BTreeSet<Feature>,
}

impl Target {
    pub fn new(arch: Arch, bits: u8, os: Os) -> Self {
        Self {
            arch,
            bits,
            os,
            features: BTreeSet::new(),
        }
    }

    /// The target of the machine running this process, without optional features.
    pub fn host() -> Self {
        let arch = match std::env::consts::ARCH {
            "x86" | "x86_64" => Arch::X86,
            "arm" | "aarch64" => Arch::Arm,
            "mips" | "mips64" => Arch::Mips,
            "powerpc" | "powerpc64" => Arch::PowerPC,
            "wasm32" | "wasm64" => Arch::Wasm,
            "riscv32" | "riscv64" => Arch::RiscV,
            _ => Arch::X86,
        };
        let os = match std::env::consts::OS {
            "linux" => Os::Linux,
            "windows" => Os::Windows,
            "macos" => Os::OSX,
            "android" => Os::Android,
            "ios" => Os::IOS,
            _ => Os::NoOS,
        };
        let bits = if cfg!(target_pointer_width = "32") { 32 } else { 64 };
        Self::new(arch, bits, os)
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.insert(feature);
        self
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Natural SIMD width, in lanes, for the given element type.
    pub fn natural_vector_size(&self, ty: ScalarType) -> usize {
        let vector_bytes = if self.has_feature(Feature::Avx512) {
            64
        } else if self.has_feature(Feature::Avx2) {
            32
        } else {
            16
        };
        (vector_bytes / ty.bytes().max(1)).max(1)
    }

    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |detail: &str| PipelineError::lookup("Target", format!("{} ({})", s, detail));

        let mut tokens = s.split('-').peekable();
        let mut arch = None;
        let mut bits = None;
        let mut os = None;
        let mut features = BTreeSet::new();

        if tokens.peek() == Some(&"host") {
            tokens.next();
            let host = Self::host();
            arch = Some(host.arch);
            bits = Some(host.bits);
            os = Some(host.os);
        }

        for token in tokens {
            if let Some(a) = lookup(&ARCH_NAMES, token) {
                if arch.replace(a).is_some() {
                    return Err(invalid("more than one architecture"));
                }
            } else if token == "32" || token == "64" {
                if bits.replace(if token == "32" { 32 } else { 64 }).is_some() {
                    return Err(invalid("more than one bit width"));
                }
            } else if let Some(o) = lookup(&OS_NAMES, token) {
                if os.replace(o).is_some() {
                    return Err(invalid("more than one operating system"));
                }
            } else if let Some(feature) = lookup(&FEATURE_NAMES, token) {
                if !features.insert(feature) {
                    return Err(invalid("repeated feature"));
                }
            } else {
                return Err(invalid(&format!("unknown token '{}'", token)));
            }
        }

        match (arch, bits, os) {
            (Some(arch), Some(bits), Some(os)) => Ok(Self {
                arch,
                bits,
                os,
                features,
            }),
            _ => Err(invalid("expected arch-bits-os")),
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::host()
    }
}

impl FromStr for Target {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.arch, self.bits, self.os)?;
        for feature in &self.features {
            write!(f, "-{}", feature)?;
        }
        Ok(())
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_round_trip() {
        let target = Target::new(Arch::Arm, 64, Os::Android)
            .with_feature(Feature::Neon)
            .with_feature(Feature::Debug);
        let text = target.to_string();
        assert_eq!(text, "arm-64-android-neon-debug");
        assert_eq!(Target::parse(&text).unwrap(), target);
    }

    #[test]
    fn test_token_order_is_free() {
        let a = Target::parse("linux-avx-x86-64").unwrap();
        let b = Target::parse("x86-64-linux-avx").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_host_prefix() {
        let t = Target::parse("host-cuda").unwrap();
        assert_eq!(t.arch, Target::host().arch);
        assert!(t.has_feature(Feature::Cuda));
    }

    #[test]
    fn test_rejects_bad_targets() {
        for bad in ["", "x86-64", "x86-64-linux-warp_drive", "x86-arm-64-linux", "x86-64-linux-avx-avx"] {
            assert!(
                matches!(Target::parse(bad), Err(PipelineError::Lookup { .. })),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_natural_vector_size() {
        let base = Target::new(Arch::X86, 64, Os::Linux);
        assert_eq!(base.natural_vector_size(ScalarType::Float(32)), 4);
        assert_eq!(base.natural_vector_size(ScalarType::UInt(8)), 16);
        let avx2 = base.with_feature(Feature::Avx2);
        assert_eq!(avx2.natural_vector_size(ScalarType::Float(32)), 8);
    }
}
