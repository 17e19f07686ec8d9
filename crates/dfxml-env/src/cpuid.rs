//! CPU identification via the `cpuid` instruction (x86 and x86_64 only).

use dfxml_core::DfxmlWriter;
use serde::Serialize;

use crate::error::Result;
use crate::WriteDfxml;

/// Processor identification facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuId {
    pub identification: String,
    pub family: u32,
    pub model: u32,
    pub stepping: u32,
    pub efamily: u32,
    pub emodel: u32,
    pub brand: u32,
    pub clflush_size: u32,
    pub nproc: u32,
    pub apicid: u32,
    /// Cache size in bytes from extended leaf `0x8000_0006`, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l1_cache_size: Option<u64>,
}

/// Bits `base..=end` of `value`.
fn bits(value: u32, base: u32, end: u32) -> u32 {
    let width = end - base + 1;
    if width >= 32 {
        value >> base
    } else {
        (value >> base) & ((1 << width) - 1)
    }
}

impl CpuId {
    /// Decode the signature (`eax`) and misc (`ebx`) words of leaf 1.
    pub fn from_registers(vendor: String, eax: u32, ebx: u32, cache_ecx: Option<u32>) -> Self {
        Self {
            identification: vendor,
            family: bits(eax, 8, 11),
            model: bits(eax, 4, 7),
            stepping: bits(eax, 0, 3),
            efamily: bits(eax, 20, 27),
            emodel: bits(eax, 16, 19),
            brand: bits(ebx, 0, 7),
            clflush_size: bits(ebx, 8, 15) * 8,
            nproc: bits(ebx, 16, 23),
            apicid: bits(ebx, 24, 31),
            l1_cache_size: cache_ecx.map(|ecx| u64::from(bits(ecx, 16, 31)) * 1024),
        }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn collect() -> Option<CpuId> {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::__cpuid;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::__cpuid;

    // SAFETY: cpuid is available on every x86_64 CPU and on every x86 CPU
    // Rust targets.
    #[allow(unused_unsafe)]
    let (leaf0, leaf1, max_extended) =
        unsafe { (__cpuid(0), __cpuid(1), __cpuid(0x8000_0000).eax) };

    let mut vendor = Vec::with_capacity(12);
    for word in [leaf0.ebx, leaf0.edx, leaf0.ecx] {
        vendor.extend_from_slice(&word.to_le_bytes());
    }
    let vendor = String::from_utf8_lossy(&vendor).trim_end_matches('\0').to_owned();

    let cache_ecx = if max_extended >= 0x8000_0006 {
        #[allow(unused_unsafe)]
        let leaf = unsafe { __cpuid(0x8000_0006) };
        Some(leaf.ecx)
    } else {
        None
    };

    Some(CpuId::from_registers(vendor, leaf1.eax, leaf1.ebx, cache_ecx))
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub fn collect() -> Option<CpuId> {
    None
}

impl WriteDfxml for CpuId {
    fn write_dfxml(&self, writer: &DfxmlWriter) -> Result<()> {
        writer.push("cpuid", "")?;
        writer.write_element("identification", &self.identification, "")?;
        writer.write_value("family", self.family)?;
        writer.write_value("model", self.model)?;
        writer.write_value("stepping", self.stepping)?;
        writer.write_value("efamily", self.efamily)?;
        writer.write_value("emodel", self.emodel)?;
        writer.write_value("brand", self.brand)?;
        writer.write_value("clflush_size", self.clflush_size)?;
        writer.write_value("nproc", self.nproc)?;
        writer.write_value("apicid", self.apicid)?;
        if let Some(size) = self.l1_cache_size {
            writer.write_value("L1_cache_size", size)?;
        }
        writer.pop()?;
        Ok(())
    }
}
