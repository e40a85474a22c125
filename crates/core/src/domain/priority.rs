/// Well-known start priorities for the standard services.
///
/// Lower values start first and stop last, so a service may rely on every
/// service with a smaller priority being available when it starts.
pub struct ServicePriority;

impl ServicePriority {
    pub const TEXT_FORMAT: i32 = 0;
    pub const CONFIGURATION: i32 = 1000;
    pub const EVENT_BUS: i32 = 2000;
    pub const SCHEDULER: i32 = 3000;
    pub const PLATFORM_PROXY: i32 = 4000;
    pub const ALIAS_HANDLER: i32 = 5000;
    pub const MATERIAL_REGISTRY: i32 = 5500;
    pub const WORLD_REGISTRY: i32 = 6000;
    pub const PERMISSION_PROXY: i32 = 7000;
    pub const BRUSH_MANAGER: i32 = 8000;
    pub const PLAYER_REGISTRY: i32 = 9000;
    pub const COMMAND_HANDLER: i32 = 10000;
    pub const BIOME_REGISTRY: i32 = 12000;
    pub const UNDO_HANDLER: i32 = 13000;
}
