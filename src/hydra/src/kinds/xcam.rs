//! Extra cameras
//!
//! Rotations are stored as quaternions and written to the export as
//! row-major basis vectors.

use serde::Serialize;

use crate::asset::{Asset, AssetHeader, AssetKind, Backing};
use crate::cursor::Record;
use crate::export::ExportTarget;
use crate::gdt::GdtWriter;
use crate::json::{round4, to_pretty_string};
use crate::pool::PoolDescriptor;
use crate::session::Session;
use crate::Result;

const ENTRY_SIZE: usize = 168;
const CAMERA_SIZE: usize = 32;
const CAMERA_FRAME_SIZE: usize = 48;
const NOTETRACK_SIZE: usize = 8;
const BONE_ROOT_HEADER_SIZE: u64 = 16;
const BONE_ROOT_FRAME_SIZE: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    fn read(record: &Record, offset: usize) -> Result<Self> {
        Ok(Self {
            x: f64::from(record.f32_at(offset)?),
            y: f64::from(record.f32_at(offset + 4)?),
            z: f64::from(record.f32_at(offset + 8)?),
            w: f64::from(record.f32_at(offset + 12)?),
        })
    }

    /// Rotation matrix, one row per axis
    pub fn to_matrix(self) -> [[f64; 3]; 3] {
        let Self { x, y, z, w } = self;
        [
            [
                1.0 - 2.0 * (y * y + z * z),
                2.0 * (x * y - w * z),
                2.0 * (x * z + w * y),
            ],
            [
                2.0 * (x * y + w * z),
                1.0 - 2.0 * (x * x + z * z),
                2.0 * (y * z - w * x),
            ],
            [
                2.0 * (x * z - w * y),
                2.0 * (y * z + w * x),
                1.0 - 2.0 * (x * x + y * y),
            ],
        ]
    }
}

fn round3(v: [f64; 3]) -> [f64; 3] {
    v.map(round4)
}

fn column(m: &[[f64; 3]; 3], i: usize) -> [f64; 3] {
    round3([m[0][i], m[1][i], m[2][i]])
}

fn vec3(record: &Record, offset: usize) -> Result<[f64; 3]> {
    Ok(round3([
        f64::from(record.f32_at(offset)?),
        f64::from(record.f32_at(offset + 4)?),
        f64::from(record.f32_at(offset + 8)?),
    ]))
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Axis {
    pub x: [f64; 3],
    pub y: [f64; 3],
    pub z: [f64; 3],
}

impl From<[[f64; 3]; 3]> for Axis {
    fn from(m: [[f64; 3]; 3]) -> Self {
        Self {
            x: round3(m[0]),
            y: round3(m[1]),
            z: round3(m[2]),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Align {
    pub tag: &'static str,
    pub offset: [f64; 3],
    pub axis: Axis,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoneRootFrame {
    pub frame: usize,
    pub offset: [f64; 3],
    pub axis: Axis,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoneRoot {
    pub name: String,
    pub axis: Axis,
    pub animation: Vec<BoneRootFrame>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraFrame {
    pub frame: i32,
    pub origin: [f64; 3],
    pub dir: [f64; 3],
    pub up: [f64; 3],
    pub right: [f64; 3],
    pub flen: f64,
    pub fov: f64,
    pub fdist: f64,
    pub fstop: f64,
    pub lense: i32,
}

impl CameraFrame {
    fn read(record: &Record) -> Result<Self> {
        let m = Quaternion::read(record, 16)?.to_matrix();
        let scalar = |offset| record.f32_at(offset).map(|v| round4(f64::from(v)));

        Ok(Self {
            frame: record.i32_at(0)?,
            origin: vec3(record, 4)?,
            dir: column(&m, 0),
            up: column(&m, 2),
            right: column(&m, 1).map(|v| -v + 0.0),
            fov: scalar(32)?,
            flen: scalar(36)?,
            fdist: scalar(40)?,
            fstop: scalar(44)?,
            lense: 10,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Camera {
    pub name: String,
    pub index: i32,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub aperture: &'static str,
    pub origin: [f64; 3],
    pub dir: [f64; 3],
    pub up: [f64; 3],
    pub right: [f64; 3],
    pub flen: f64,
    pub fov: f64,
    pub fdist: f64,
    pub fstop: f64,
    pub lense: i32,
    pub aspectratio: f64,
    pub nearz: f64,
    pub farz: f64,
    pub animation: Vec<CameraFrame>,
}

impl Camera {
    fn new(name: String, index: i32, farz: f64) -> Self {
        Self {
            name,
            index,
            kind: "Perspective",
            aperture: "FOCAL_LENGTH",
            origin: [0.0; 3],
            dir: [0.0; 3],
            up: [0.0; 3],
            right: [0.0; 3],
            flen: 27.0,
            fov: 28.7985,
            fdist: 109.4973,
            fstop: 1.2,
            lense: 10,
            aspectratio: 1.7786,
            nearz: 3.937,
            farz,
            animation: Vec::new(),
        }
    }

    /// The camera's resting pose is its first frame
    fn push_frame(&mut self, frame: CameraFrame) {
        if self.animation.is_empty() {
            self.origin = frame.origin;
            self.dir = frame.dir;
            self.up = frame.up;
            self.right = frame.right;
            self.flen = frame.flen;
            self.fov = frame.fov;
            self.fdist = frame.fdist;
            self.fstop = frame.fstop;
        }
        self.animation.push(frame);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notetrack {
    pub name: String,
    pub frame: i32,
}

/// Camera switch entries are not decoded; always written empty
#[derive(Debug, Clone, Serialize)]
pub struct CameraSwitch {}

#[derive(Debug, Clone, Serialize)]
pub struct XCamExport {
    pub version: i32,
    pub scene: &'static str,
    pub align: Align,
    pub framerate: i32,
    pub numframes: i32,
    #[serde(rename = "targetModelBoneRoots")]
    pub target_model_bone_roots: Vec<BoneRoot>,
    pub cameras: Vec<Camera>,
    #[serde(rename = "cameraSwitch")]
    pub camera_switch: Vec<CameraSwitch>,
    pub notetracks: Vec<Notetrack>,
}

/// Fields that only go into the GDT
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XCamSettings {
    /// hide_hud, is_looping, hide_local_player, use_firstperson_player,
    /// disableNearDof, autoMotionBlur, easeAnimationsOut
    pub flags: [u8; 7],
    pub right_stick_offset: [f32; 3],
    pub right_stick_degrees: [f32; 2],
}

impl XCamSettings {
    fn read(record: &Record) -> Result<Self> {
        let mut flags = [0u8; 7];
        for (i, flag) in flags.iter_mut().enumerate() {
            *flag = record.u8_at(16 + i)?;
        }
        Ok(Self {
            flags,
            right_stick_offset: [record.f32_at(148)?, record.f32_at(152)?, record.f32_at(156)?],
            right_stick_degrees: [record.f32_at(160)?, record.f32_at(164)?],
        })
    }

    pub fn to_gdt(&self, name: &str) -> String {
        let [
            hide_hud,
            is_looping,
            hide_local_player,
            use_fps_player,
            disable_near_dof,
            auto_motion_blur,
            ease_out,
        ] = self.flags;

        let mut gdt = GdtWriter::new();
        gdt.begin_entry(name, "xcam.gdf")
            .field("filename", format_args!("hydra_export\\\\{}.XCAM_EXPORT", name))
            .field("autoMotionBlur", auto_motion_blur)
            .field("disableNearDof", disable_near_dof)
            .field("easeAnimationsOut", ease_out)
            .field("hide_hud", hide_hud)
            .field("hide_local_player", hide_local_player)
            .field("is_looping", is_looping)
            .field("use_firstperson_player", use_fps_player)
            .field("rightStickRotateOffsetX", self.right_stick_offset[0])
            .field("rightStickRotateOffsetY", self.right_stick_offset[1])
            .field("rightStickRotateOffsetZ", self.right_stick_offset[2])
            .field("rightStickRotateMaxDegreesX", self.right_stick_degrees[0])
            .field("rightStickRotateMaxDegreesY", self.right_stick_degrees[1])
            .end_entry();
        gdt.finish()
    }
}

fn read_cameras(session: &Session, start: u64, count: usize) -> Result<Vec<Camera>> {
    let source = session.source();
    let headers = Record::read(source, start, count * CAMERA_SIZE)?;

    let mut cameras = Vec::with_capacity(count);
    let mut frame_counts = Vec::with_capacity(count);
    for i in 0..count {
        let at = i * CAMERA_SIZE;
        let name = session.string(headers.i32_at(at)?).unwrap_or_default();
        let farz = round4(f64::from(headers.f32_at(at + 24)?));
        cameras.push(Camera::new(name, headers.i32_at(at + 4)?, farz));
        frame_counts.push(headers.count_at(at + 8)?);
    }

    // Frames of every camera follow all camera headers
    let mut address = start + (count * CAMERA_SIZE) as u64;
    for (camera, frames) in cameras.iter_mut().zip(frame_counts) {
        for _ in 0..frames {
            let record = Record::read(source, address, CAMERA_FRAME_SIZE)?;
            camera.push_frame(CameraFrame::read(&record)?);
            address += CAMERA_FRAME_SIZE as u64;
        }
    }

    Ok(cameras)
}

fn read_notetracks(session: &Session, start: u64, count: usize) -> Result<Vec<Notetrack>> {
    let data = Record::read(session.source(), start, count * NOTETRACK_SIZE)?;
    (0..count)
        .map(|i| {
            let at = i * NOTETRACK_SIZE;
            Ok(Notetrack {
                name: session.string(data.i32_at(at)?).unwrap_or_default(),
                frame: data.i32_at(at + 4)?,
            })
        })
        .collect()
}

fn read_bone_root(session: &Session, start: u64) -> Result<BoneRoot> {
    let header = Record::read(session.source(), start, BONE_ROOT_HEADER_SIZE as usize)?;
    let frames = header.count_at(4)?;
    let data = Record::read(
        session.source(),
        start + BONE_ROOT_HEADER_SIZE,
        frames * BONE_ROOT_FRAME_SIZE,
    )?;

    let animation = (0..frames)
        .map(|i| {
            let at = i * BONE_ROOT_FRAME_SIZE;
            let mut offset = vec3(&data, at)?;
            offset[1] = -offset[1];

            let q = Quaternion::read(&data, at + 12)?;
            let q = Quaternion {
                x: round4(q.x),
                y: -round4(q.y),
                z: -round4(q.z),
                w: round4(q.w),
            };

            Ok(BoneRootFrame {
                frame: i,
                offset,
                axis: q.to_matrix().into(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BoneRoot {
        name: session.string(header.i32_at(0)?).unwrap_or_default(),
        axis: Axis::default(),
        animation,
    })
}

impl XCamExport {
    pub fn read(session: &Session, record: &Record) -> Result<Self> {
        let mut align = Quaternion::read(record, 40)?;
        align.y = -align.y;
        align.z = -align.z;

        let cameras = match record.ptr_at(80)? {
            Some(ptr) => read_cameras(session, ptr, record.count_at(24)?)?,
            None => Vec::new(),
        };
        let notetracks = match record.ptr_at(96)? {
            Some(ptr) => read_notetracks(session, ptr, record.count_at(36)?)?,
            None => Vec::new(),
        };
        let target_model_bone_roots = match record.ptr_at(72)? {
            Some(ptr) => vec![read_bone_root(session, ptr)?],
            None => Vec::new(),
        };

        Ok(Self {
            version: 1,
            scene: "exported_via_hydra.fbx",
            align: Align {
                tag: "tag_align",
                offset: vec3(record, 56)?,
                axis: align.to_matrix().into(),
            },
            framerate: record.i32_at(32)?,
            numframes: record.i32_at(28)?,
            target_model_bone_roots,
            cameras,
            camera_switch: Vec::new(),
            notetracks,
        })
    }
}

pub fn enumerate(session: &Session, pool: &PoolDescriptor) -> Result<Vec<Asset>> {
    super::walk_pool(session, pool, |record, path| {
        Ok(Asset::new(
            AssetKind::XCam,
            Backing::Process,
            path,
            record.address(),
            AssetHeader::XCam {
                frames: record.i32_at(28)?,
                framerate: record.i32_at(32)?,
            },
        ))
    })
}

pub fn export(session: &Session, asset: &Asset, target: &ExportTarget) -> Result<()> {
    let record = Record::read(session.source(), asset.record, ENTRY_SIZE)?;
    let settings = XCamSettings::read(&record)?;
    let xcam = XCamExport::read(session, &record)?;

    target.write(
        &format!("source_data/xcam_gdts/{}_gdt.gdt", asset.path),
        settings.to_gdt(&asset.path),
    )?;
    target.write(
        &format!("xanim_export/hydra_export/{}.XCAM_EXPORT", asset.path),
        to_pretty_string(&xcam)?,
    )?;
    Ok(())
}
