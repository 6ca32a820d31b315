//! Table accessors for the exported scene schema (`schema/scene.fbs`).
//!
//! These mirror what `flatc --rust` emits for the schema: each table is a thin
//! wrapper around a [`flatbuffers::Table`] with one accessor per field and a
//! [`flatbuffers::Verifiable`] impl, so [`flatbuffers::root`] checks the whole
//! buffer before any accessor runs. Enum fields are exposed as their raw byte;
//! conversion (and rejection of unknown values) happens in the decoder.
//!
//! Vtable slots follow field declaration order in `schema/scene.fbs`, starting
//! at 4 and stepping by 2. Keep the `VT_*` constants in sync with it:
//!
//! | Table | Fields (slot 4, 6, 8, ...) |
//! |---|---|
//! | `ExpScene` | meshes, camera, animated_textures |
//! | `ExpMesh` | vertex_buffer, index_buffer, index_type, vertex_format, material |
//! | `ExpVertexFormat` | elements, vertex_size |
//! | `ExpVertexFormatElement` | usage, type, count, offset, normalized, index |
//! | `ExpMaterial` | name, shader_name, transparency, samplers |
//! | `ExpSampler` | texture, texture_id, linear_filtering, use_mipmaps |
//! | `ExpCameraSettings` | yaw, pitch, roll, zoom (default 1) |
//! | `ExpAnimatedTexturePart` | texture_id, frames_path, x, y, width, height, frame_count, frames_per_row, frames |
//! | `ExpAnimatedTexturePartFrame` | index, time |

use flatbuffers::{ForwardsUOffset, Follow, Table, VOffsetT, Vector, Verifiable, Verifier, InvalidFlatbuffer};

macro_rules! table {
    ($name:ident) => {
        #[derive(Copy, Clone, PartialEq)]
        pub struct $name<'a> {
            pub _tab: Table<'a>,
        }

        impl<'a> Follow<'a> for $name<'a> {
            type Inner = $name<'a>;
            #[inline]
            unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
                Self {
                    _tab: unsafe { Table::new(buf, loc) },
                }
            }
        }

        impl std::fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("loc", &self._tab.loc())
                    .finish()
            }
        }
    };
}

type TableVector<'a, T> = Vector<'a, ForwardsUOffset<T>>;

table!(ExpScene);
table!(ExpMesh);
table!(ExpVertexFormat);
table!(ExpVertexFormatElement);
table!(ExpMaterial);
table!(ExpSampler);
table!(ExpCameraSettings);
table!(ExpAnimatedTexturePart);
table!(ExpAnimatedTexturePartFrame);

pub const INDEX_TYPE_UINT: u8 = 0;
pub const INDEX_TYPE_USHORT: u8 = 1;

pub const ELEMENT_TYPE_FLOAT: u8 = 0;
pub const ELEMENT_TYPE_UBYTE: u8 = 1;
pub const ELEMENT_TYPE_BYTE: u8 = 2;
pub const ELEMENT_TYPE_USHORT: u8 = 3;
pub const ELEMENT_TYPE_SHORT: u8 = 4;
pub const ELEMENT_TYPE_UINT: u8 = 5;
pub const ELEMENT_TYPE_INT: u8 = 6;

pub const ELEMENT_USAGE_POSITION: u8 = 0;
pub const ELEMENT_USAGE_NORMAL: u8 = 1;
pub const ELEMENT_USAGE_COLOR: u8 = 2;
pub const ELEMENT_USAGE_UV: u8 = 3;

pub const TRANSPARENCY_DISABLED: u8 = 0;
pub const TRANSPARENCY_ADDITIVE: u8 = 1;
pub const TRANSPARENCY_LIGHTNING: u8 = 2;
pub const TRANSPARENCY_GLINT: u8 = 3;
pub const TRANSPARENCY_CRUMBLING: u8 = 4;
pub const TRANSPARENCY_TRANSLUCENT: u8 = 5;

impl<'a> ExpScene<'a> {
    pub const VT_MESHES: VOffsetT = 4;
    pub const VT_CAMERA: VOffsetT = 6;
    pub const VT_ANIMATED_TEXTURES: VOffsetT = 8;

    pub fn meshes(&self) -> Option<TableVector<'a, ExpMesh<'a>>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<TableVector<'a, ExpMesh>>>(Self::VT_MESHES, None)
        }
    }

    pub fn camera(&self) -> Option<ExpCameraSettings<'a>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<ExpCameraSettings>>(Self::VT_CAMERA, None)
        }
    }

    pub fn animated_textures(&self) -> Option<TableVector<'a, ExpAnimatedTexturePart<'a>>> {
        unsafe {
            self._tab.get::<ForwardsUOffset<TableVector<'a, ExpAnimatedTexturePart>>>(
                Self::VT_ANIMATED_TEXTURES,
                None,
            )
        }
    }
}

impl Verifiable for ExpScene<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<TableVector<'_, ExpMesh>>>("meshes", Self::VT_MESHES, false)?
            .visit_field::<ForwardsUOffset<ExpCameraSettings>>("camera", Self::VT_CAMERA, false)?
            .visit_field::<ForwardsUOffset<TableVector<'_, ExpAnimatedTexturePart>>>(
                "animated_textures",
                Self::VT_ANIMATED_TEXTURES,
                false,
            )?
            .finish();
        Ok(())
    }
}

impl<'a> ExpMesh<'a> {
    pub const VT_VERTEX_BUFFER: VOffsetT = 4;
    pub const VT_INDEX_BUFFER: VOffsetT = 6;
    pub const VT_INDEX_TYPE: VOffsetT = 8;
    pub const VT_VERTEX_FORMAT: VOffsetT = 10;
    pub const VT_MATERIAL: VOffsetT = 12;

    pub fn vertex_buffer(&self) -> Option<Vector<'a, u8>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, u8>>>(Self::VT_VERTEX_BUFFER, None)
        }
    }

    pub fn index_buffer(&self) -> Option<Vector<'a, u8>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, u8>>>(Self::VT_INDEX_BUFFER, None)
        }
    }

    pub fn index_type(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_INDEX_TYPE, Some(INDEX_TYPE_UINT)) }
            .unwrap_or(INDEX_TYPE_UINT)
    }

    pub fn vertex_format(&self) -> Option<ExpVertexFormat<'a>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<ExpVertexFormat>>(Self::VT_VERTEX_FORMAT, None)
        }
    }

    pub fn material(&self) -> Option<ExpMaterial<'a>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<ExpMaterial>>(Self::VT_MATERIAL, None)
        }
    }
}

impl Verifiable for ExpMesh<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, u8>>>("vertex_buffer", Self::VT_VERTEX_BUFFER, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, u8>>>("index_buffer", Self::VT_INDEX_BUFFER, false)?
            .visit_field::<u8>("index_type", Self::VT_INDEX_TYPE, false)?
            .visit_field::<ForwardsUOffset<ExpVertexFormat>>("vertex_format", Self::VT_VERTEX_FORMAT, false)?
            .visit_field::<ForwardsUOffset<ExpMaterial>>("material", Self::VT_MATERIAL, false)?
            .finish();
        Ok(())
    }
}

impl<'a> ExpVertexFormat<'a> {
    pub const VT_ELEMENTS: VOffsetT = 4;
    pub const VT_VERTEX_SIZE: VOffsetT = 6;

    pub fn elements(&self) -> Option<TableVector<'a, ExpVertexFormatElement<'a>>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<TableVector<'a, ExpVertexFormatElement>>>(Self::VT_ELEMENTS, None)
        }
    }

    pub fn vertex_size(&self) -> i32 {
        unsafe { self._tab.get::<i32>(Self::VT_VERTEX_SIZE, Some(0)) }.unwrap_or(0)
    }
}

impl Verifiable for ExpVertexFormat<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<TableVector<'_, ExpVertexFormatElement>>>(
                "elements",
                Self::VT_ELEMENTS,
                false,
            )?
            .visit_field::<i32>("vertex_size", Self::VT_VERTEX_SIZE, false)?
            .finish();
        Ok(())
    }
}

impl ExpVertexFormatElement<'_> {
    pub const VT_USAGE: VOffsetT = 4;
    pub const VT_TYPE_: VOffsetT = 6;
    pub const VT_COUNT: VOffsetT = 8;
    pub const VT_OFFSET: VOffsetT = 10;
    pub const VT_NORMALIZED: VOffsetT = 12;
    pub const VT_INDEX: VOffsetT = 14;

    pub fn usage(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_USAGE, Some(0)) }.unwrap_or(0)
    }

    pub fn type_(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_TYPE_, Some(0)) }.unwrap_or(0)
    }

    pub fn count(&self) -> i32 {
        unsafe { self._tab.get::<i32>(Self::VT_COUNT, Some(0)) }.unwrap_or(0)
    }

    pub fn offset(&self) -> i32 {
        unsafe { self._tab.get::<i32>(Self::VT_OFFSET, Some(0)) }.unwrap_or(0)
    }

    pub fn normalized(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_NORMALIZED, Some(false)) }.unwrap_or(false)
    }

    pub fn index(&self) -> i32 {
        unsafe { self._tab.get::<i32>(Self::VT_INDEX, Some(0)) }.unwrap_or(0)
    }
}

impl Verifiable for ExpVertexFormatElement<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<u8>("usage", Self::VT_USAGE, false)?
            .visit_field::<u8>("type_", Self::VT_TYPE_, false)?
            .visit_field::<i32>("count", Self::VT_COUNT, false)?
            .visit_field::<i32>("offset", Self::VT_OFFSET, false)?
            .visit_field::<bool>("normalized", Self::VT_NORMALIZED, false)?
            .visit_field::<i32>("index", Self::VT_INDEX, false)?
            .finish();
        Ok(())
    }
}

impl<'a> ExpMaterial<'a> {
    pub const VT_NAME: VOffsetT = 4;
    pub const VT_SHADER_NAME: VOffsetT = 6;
    pub const VT_TRANSPARENCY: VOffsetT = 8;
    pub const VT_SAMPLERS: VOffsetT = 10;

    pub fn name(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_NAME, None) }
    }

    pub fn shader_name(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_SHADER_NAME, None) }
    }

    pub fn transparency(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_TRANSPARENCY, Some(TRANSPARENCY_DISABLED)) }
            .unwrap_or(TRANSPARENCY_DISABLED)
    }

    pub fn samplers(&self) -> Option<TableVector<'a, ExpSampler<'a>>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<TableVector<'a, ExpSampler>>>(Self::VT_SAMPLERS, None)
        }
    }
}

impl Verifiable for ExpMaterial<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .visit_field::<ForwardsUOffset<&str>>("shader_name", Self::VT_SHADER_NAME, false)?
            .visit_field::<u8>("transparency", Self::VT_TRANSPARENCY, false)?
            .visit_field::<ForwardsUOffset<TableVector<'_, ExpSampler>>>("samplers", Self::VT_SAMPLERS, false)?
            .finish();
        Ok(())
    }
}

impl<'a> ExpSampler<'a> {
    pub const VT_TEXTURE: VOffsetT = 4;
    pub const VT_TEXTURE_ID: VOffsetT = 6;
    pub const VT_LINEAR_FILTERING: VOffsetT = 8;
    pub const VT_USE_MIPMAPS: VOffsetT = 10;

    pub fn texture(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_TEXTURE, None) }
    }

    pub fn texture_id(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_TEXTURE_ID, None) }
    }

    pub fn linear_filtering(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_LINEAR_FILTERING, Some(false)) }.unwrap_or(false)
    }

    pub fn use_mipmaps(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_USE_MIPMAPS, Some(false)) }.unwrap_or(false)
    }
}

impl Verifiable for ExpSampler<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("texture", Self::VT_TEXTURE, false)?
            .visit_field::<ForwardsUOffset<&str>>("texture_id", Self::VT_TEXTURE_ID, false)?
            .visit_field::<bool>("linear_filtering", Self::VT_LINEAR_FILTERING, false)?
            .visit_field::<bool>("use_mipmaps", Self::VT_USE_MIPMAPS, false)?
            .finish();
        Ok(())
    }
}

impl ExpCameraSettings<'_> {
    pub const VT_YAW: VOffsetT = 4;
    pub const VT_PITCH: VOffsetT = 6;
    pub const VT_ROLL: VOffsetT = 8;
    pub const VT_ZOOM: VOffsetT = 10;

    fn scalar(&self, slot: VOffsetT, default: f32) -> f32 {
        unsafe { self._tab.get::<f32>(slot, Some(default)) }.unwrap_or(default)
    }

    pub fn yaw(&self) -> f32 {
        self.scalar(Self::VT_YAW, 0.0)
    }

    pub fn pitch(&self) -> f32 {
        self.scalar(Self::VT_PITCH, 0.0)
    }

    pub fn roll(&self) -> f32 {
        self.scalar(Self::VT_ROLL, 0.0)
    }

    pub fn zoom(&self) -> f32 {
        self.scalar(Self::VT_ZOOM, 1.0)
    }
}

impl Verifiable for ExpCameraSettings<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<f32>("yaw", Self::VT_YAW, false)?
            .visit_field::<f32>("pitch", Self::VT_PITCH, false)?
            .visit_field::<f32>("roll", Self::VT_ROLL, false)?
            .visit_field::<f32>("zoom", Self::VT_ZOOM, false)?
            .finish();
        Ok(())
    }
}

impl<'a> ExpAnimatedTexturePart<'a> {
    pub const VT_TEXTURE_ID: VOffsetT = 4;
    pub const VT_FRAMES_PATH: VOffsetT = 6;
    pub const VT_X: VOffsetT = 8;
    pub const VT_Y: VOffsetT = 10;
    pub const VT_WIDTH: VOffsetT = 12;
    pub const VT_HEIGHT: VOffsetT = 14;
    pub const VT_FRAME_COUNT: VOffsetT = 16;
    pub const VT_FRAMES_PER_ROW: VOffsetT = 18;
    pub const VT_FRAMES: VOffsetT = 20;

    fn int(&self, slot: VOffsetT) -> i32 {
        unsafe { self._tab.get::<i32>(slot, Some(0)) }.unwrap_or(0)
    }

    pub fn texture_id(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_TEXTURE_ID, None) }
    }

    pub fn frames_path(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_FRAMES_PATH, None) }
    }

    pub fn x(&self) -> i32 {
        self.int(Self::VT_X)
    }

    pub fn y(&self) -> i32 {
        self.int(Self::VT_Y)
    }

    pub fn width(&self) -> i32 {
        self.int(Self::VT_WIDTH)
    }

    pub fn height(&self) -> i32 {
        self.int(Self::VT_HEIGHT)
    }

    pub fn frame_count(&self) -> i32 {
        self.int(Self::VT_FRAME_COUNT)
    }

    pub fn frames_per_row(&self) -> i32 {
        self.int(Self::VT_FRAMES_PER_ROW)
    }

    pub fn frames(&self) -> Option<TableVector<'a, ExpAnimatedTexturePartFrame<'a>>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<TableVector<'a, ExpAnimatedTexturePartFrame>>>(Self::VT_FRAMES, None)
        }
    }
}

impl Verifiable for ExpAnimatedTexturePart<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("texture_id", Self::VT_TEXTURE_ID, false)?
            .visit_field::<ForwardsUOffset<&str>>("frames_path", Self::VT_FRAMES_PATH, false)?
            .visit_field::<i32>("x", Self::VT_X, false)?
            .visit_field::<i32>("y", Self::VT_Y, false)?
            .visit_field::<i32>("width", Self::VT_WIDTH, false)?
            .visit_field::<i32>("height", Self::VT_HEIGHT, false)?
            .visit_field::<i32>("frame_count", Self::VT_FRAME_COUNT, false)?
            .visit_field::<i32>("frames_per_row", Self::VT_FRAMES_PER_ROW, false)?
            .visit_field::<ForwardsUOffset<TableVector<'_, ExpAnimatedTexturePartFrame>>>(
                "frames",
                Self::VT_FRAMES,
                false,
            )?
            .finish();
        Ok(())
    }
}

impl ExpAnimatedTexturePartFrame<'_> {
    pub const VT_INDEX: VOffsetT = 4;
    pub const VT_TIME: VOffsetT = 6;

    pub fn index(&self) -> i32 {
        unsafe { self._tab.get::<i32>(Self::VT_INDEX, Some(0)) }.unwrap_or(0)
    }

    pub fn time(&self) -> i32 {
        unsafe { self._tab.get::<i32>(Self::VT_TIME, Some(0)) }.unwrap_or(0)
    }
}

impl Verifiable for ExpAnimatedTexturePartFrame<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i32>("index", Self::VT_INDEX, false)?
            .visit_field::<i32>("time", Self::VT_TIME, false)?
            .finish();
        Ok(())
    }
}

/// Verifies `data` and returns its root table.
pub fn root_as_scene(data: &[u8]) -> Result<ExpScene<'_>, InvalidFlatbuffer> {
    flatbuffers::root::<ExpScene>(data)
}
