//! Live Process Memory Source
//!
//! Memory source implementation for reading from a running game process.

use anyhow::{bail, Context, Result};
use hydra::{MemoryRegion, MemorySource};
use process_memory::{CopyAddress, ProcessHandle, TryIntoProcessHandle};
use std::path::PathBuf;
use sysinfo::System;
use tracing::{debug, info};

/// An attached game process
pub struct GameProcess {
    pub pid: u32,
    pub handle: ProcessHandle,
    pub exe_path: PathBuf,
    pub maps: Vec<MemoryRegion>,
}

// SAFETY: process handles are process-wide and can be used from any thread.
unsafe impl Send for GameProcess {}
unsafe impl Sync for GameProcess {}

impl MemorySource for GameProcess {
    fn read_bytes(&self, address: u64, size: usize) -> Option<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        self.handle
            .copy_address(usize::try_from(address).ok()?, &mut buffer)
            .ok()?;
        Some(buffer)
    }

    fn regions(&self) -> &[MemoryRegion] {
        &self.maps
    }

    fn is_live(&self) -> bool {
        true
    }
}

impl GameProcess {
    /// Attach to `pid`, or to the largest process named `name`
    pub fn attach(pid: Option<u32>, name: &str) -> Result<Self> {
        let pid = match pid {
            Some(pid) => pid,
            None => find_process(name)?,
        };
        let handle = (pid as process_memory::Pid)
            .try_into_process_handle()
            .context("Failed to attach to process. Try running with sudo.")?;

        let maps = read_maps(pid)?;

        let exe_path = std::fs::read_link(format!("/proc/{}/exe", pid))
            .unwrap_or_else(|_| PathBuf::from("unknown"));

        info!(pid, regions = maps.len(), "Attached to process");
        Ok(GameProcess {
            pid,
            handle,
            exe_path,
            maps,
        })
    }

    /// Find the main executable module
    pub fn main_module(&self, name: &str) -> Option<&MemoryRegion> {
        main_module(&self.maps, name)
    }

    /// Get process info summary
    pub fn info(&self, name: &str) -> String {
        let module_info = self
            .main_module(name)
            .map(|m| format!("Base: {:#x}, Size: {:#x}", m.start, m.size()))
            .unwrap_or_else(|| "Not found".to_string());

        format!(
            "PID: {}\nExecutable: {}\nMain Module: {}\nMemory Regions: {}",
            self.pid,
            self.exe_path.display(),
            module_info,
            self.maps.len()
        )
    }
}

/// Lowest region mapped from `<name>.exe`, the image base
pub fn main_module<'a>(maps: &'a [MemoryRegion], name: &str) -> Option<&'a MemoryRegion> {
    let exe = format!("{}.exe", name.to_lowercase());
    maps.iter()
        .filter(|r| r.path.as_ref().is_some_and(|p| p.to_lowercase().ends_with(&exe)))
        .min_by_key(|r| r.start)
}

/// Find a running process by name, preferring the one using the most memory
pub fn find_process(name: &str) -> Result<u32> {
    let mut system = System::new_all();
    system.refresh_all();

    let needle = name.to_lowercase();
    let mut candidates: Vec<(u32, u64)> = Vec::new();

    for process in system.processes().values() {
        let pid = process.pid().as_u32();
        let memory = process.memory();

        let by_name = process.name().to_string_lossy().to_lowercase().contains(&needle);
        let by_cmdline = std::fs::read_to_string(format!("/proc/{}/cmdline", pid))
            .is_ok_and(|cmdline| cmdline.to_lowercase().contains(&needle));

        if by_name || by_cmdline {
            candidates.push((get_tgid(pid).unwrap_or(pid), memory));
        }
    }

    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates.dedup_by(|a, b| a.0 == b.0);

    if let Some((pid, memory)) = candidates.first() {
        debug!(pid, memory_mb = memory / 1_000_000, "Found process");
        return Ok(*pid);
    }

    bail!("{} process not found. Is the game running?", name)
}

/// Get the thread group ID (main process) for a given PID/TID
pub fn get_tgid(pid: u32) -> Option<u32> {
    let status = std::fs::read_to_string(format!("/proc/{}/status", pid)).ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("Tgid:"))
        .and_then(|tgid| tgid.trim().parse().ok())
}

fn read_maps(pid: u32) -> Result<Vec<MemoryRegion>> {
    let maps_path = format!("/proc/{}/maps", pid);
    let text = std::fs::read_to_string(&maps_path)
        .with_context(|| format!("Failed to open {}. Do you have permission?", maps_path))?;
    Ok(parse_maps(&text))
}

/// Parse the contents of /proc/pid/maps into memory regions
pub fn parse_maps(text: &str) -> Vec<MemoryRegion> {
    text.lines().filter_map(parse_maps_line).collect()
}

fn parse_maps_line(line: &str) -> Option<MemoryRegion> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let (start, end) = fields.first()?.split_once('-')?;
    let offset = fields
        .get(2)
        .and_then(|s| u64::from_str_radix(s, 16).ok())
        .unwrap_or(0);
    // Fields 3 and 4 are device and inode; Wine paths may contain spaces
    let path = (fields.len() > 5).then(|| fields[5..].join(" "));

    Some(MemoryRegion {
        start: u64::from_str_radix(start, 16).ok()?,
        end: u64::from_str_radix(end, 16).ok()?,
        perms: fields.get(1).copied().unwrap_or("").to_string(),
        offset,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "\
140000000-140001000 r--p 00000000 00:2a 1234      /games/BlackOps3.exe
140001000-142000000 r-xp 00001000 00:2a 1234      /games/BlackOps3.exe
7f0000000000-7f0000100000 rw-p 00000000 00:00 0
7f0000100000-7f0000200000 r--p 00000000 00:2a 99   /games/Black Ops III/video/intro.bk2
garbage line
";

    #[test]
    fn test_parse_maps() {
        let maps = parse_maps(MAPS);
        assert_eq!(maps.len(), 4);
        assert_eq!(maps[0].start, 0x1_4000_0000);
        assert_eq!(maps[1].perms, "r-xp");
        assert_eq!(maps[1].offset, 0x1000);
        assert_eq!(maps[1].path.as_deref(), Some("/games/BlackOps3.exe"));
        assert_eq!(maps[2].path, None);
        assert_eq!(maps[3].path.as_deref(), Some("/games/Black Ops III/video/intro.bk2"));
    }

    #[test]
    fn test_main_module_is_image_base() {
        let maps = parse_maps(MAPS);
        let module = main_module(&maps, "BlackOps3").unwrap();
        assert_eq!(module.start, 0x1_4000_0000);
        assert!(main_module(&maps, "BlackOps4").is_none());
    }
}
