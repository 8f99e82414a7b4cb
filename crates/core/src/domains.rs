//! Built-in Level-1 domain codebooks.
//!
//! Domain codebooks extend the 8-bit base space with namespaced 16-bit
//! codes: the high byte selects the domain, the low byte indexes the
//! domain's table. Four domains ship as static data:
//!
//! ```text
//! 0x01  NAV-1      navigation and spatial positioning
//! 0x02  PERCEPT-1  visual and sensor perception
//! 0x05  DIAG-1     diagnostics and system health
//! 0x06  PLAN-1     task planning and goal management
//! ```
//!
//! Tables are loaded into a [`CodebookRegistry`](crate::codebook::CodebookRegistry)
//! as a unit via `register_domain`; they are never partially registered.
//! The value-type, unit, and description columns are advisory metadata
//! for tooling and pretty-printing; the codec does not enforce them.

/// One row of a domain codebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainEntry {
    /// Index within the domain (low byte of the full 16-bit code).
    pub code: u8,
    pub mnemonic: &'static str,
    pub value_type: &'static str,
    pub unit: &'static str,
    pub description: &'static str,
}

/// A complete domain codebook, sorted by code.
#[derive(Debug, PartialEq, Eq)]
pub struct DomainTable {
    pub domain_id: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub entries: &'static [DomainEntry],
}

impl DomainTable {
    /// Look up an entry by its in-domain code.
    pub fn entry(&self, code: u8) -> Option<&'static DomainEntry> {
        self.entries
            .binary_search_by_key(&code, |entry| entry.code)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const fn d(
    code: u8,
    mnemonic: &'static str,
    value_type: &'static str,
    unit: &'static str,
    description: &'static str,
) -> DomainEntry {
    DomainEntry {
        code,
        mnemonic,
        value_type,
        unit,
        description,
    }
}

/// NAV-1: navigation and spatial positioning (domain 0x01).
pub static NAV1: DomainTable = DomainTable {
    domain_id: 0x01,
    name: "NAV-1",
    description: "Navigation and spatial positioning",
    entries: &[
        // 0x00-0x0F coordinates and pose
        d(0x00, "POSITION_3D", "ARRAY<FLOAT32,3>", "m", "3D position (x, y, z)"),
        d(0x01, "POSITION_2D", "ARRAY<FLOAT32,2>", "m", "2D position (x, y)"),
        d(0x02, "HEADING", "FLOAT32", "rad", "Heading angle from North"),
        d(0x03, "ORIENTATION_QUAT", "ARRAY<FLOAT32,4>", "", "Quaternion (w, x, y, z)"),
        d(0x04, "ORIENTATION_EULER", "ARRAY<FLOAT32,3>", "rad", "Euler angles (roll, pitch, yaw)"),
        d(0x05, "VELOCITY_3D", "ARRAY<FLOAT32,3>", "m/s", "Linear velocity vector"),
        d(0x06, "VELOCITY_SCALAR", "FLOAT32", "m/s", "Scalar speed"),
        d(0x07, "ANGULAR_VEL", "ARRAY<FLOAT32,3>", "rad/s", "Angular velocity"),
        d(0x08, "ACCELERATION_3D", "ARRAY<FLOAT32,3>", "m/s^2", "Linear acceleration"),
        d(0x09, "POSE_6DOF", "STRUCT{pos,orient}", "", "Full 6DOF pose"),
        d(0x0A, "LATITUDE", "FLOAT64", "deg", "WGS84 latitude"),
        d(0x0B, "LONGITUDE", "FLOAT64", "deg", "WGS84 longitude"),
        d(0x0C, "ALTITUDE_MSL", "FLOAT32", "m", "Altitude above mean sea level"),
        d(0x0D, "ALTITUDE_AGL", "FLOAT32", "m", "Altitude above ground level"),
        d(0x0E, "GPS_FIX", "STRUCT", "", "Complete GPS fix record"),
        d(0x0F, "COORDINATE_FRAME", "UINT8", "", "Coord frame ID"),
        // 0x30-0x3B waypoints and paths
        d(0x30, "WAYPOINT", "STRUCT{id,pos,rad}", "", "Named waypoint"),
        d(0x31, "WAYPOINT_ID", "UINT16", "", "Waypoint identifier"),
        d(0x32, "PATH", "LIST<WAYPOINT>", "", "Ordered waypoint sequence"),
        d(0x33, "PATH_SEGMENT", "STRUCT", "", "Segment with curvature"),
        d(0x34, "CURRENT_WAYPOINT", "UINT16", "", "Current target waypoint index"),
        d(0x35, "DISTANCE_TO_WP", "FLOAT32", "m", "Distance to current waypoint"),
        d(0x36, "ETA", "FLOAT32", "s", "Estimated time of arrival"),
        d(0x37, "PATH_COMPLETE", "BOOL", "", "Path completion flag"),
        d(0x38, "PATH_DEVIATION", "FLOAT32", "m", "Cross-track error"),
        d(0x39, "GEOFENCE", "LIST<POSITION_2D>", "", "Restricted area polygon"),
        d(0x3A, "GEOFENCE_STATUS", "UINT8", "", "Geofence relation status"),
        d(0x3B, "HOME_POSITION", "POSITION_3D", "m", "Designated home position"),
        // 0x60-0x69 environment and obstacles
        d(0x60, "OBSTACLE", "STRUCT", "", "Detected obstacle"),
        d(0x61, "OBSTACLE_TYPE", "UINT8", "", "Obstacle classification"),
        d(0x62, "OBSTACLE_SIZE", "ARRAY<FLOAT32,3>", "m", "Bounding box dimensions"),
        d(0x63, "OBSTACLE_LIST", "LIST<OBSTACLE>", "", "Collection of obstacles"),
        d(0x64, "CLEARANCE", "FLOAT32", "m", "Min clearance to nearest obstacle"),
        d(0x65, "COLLISION_RISK", "FLOAT16", "", "Collision probability 0.0-1.0"),
        d(0x66, "TERRAIN_TYPE", "UINT8", "", "Surface type code"),
        d(0x67, "SLOPE_ANGLE", "FLOAT16", "rad", "Ground slope"),
        d(0x68, "VISIBILITY", "FLOAT32", "m", "Visibility range"),
        d(0x69, "OCCUPANCY_GRID", "STRUCT", "", "2D occupancy grid map"),
        // 0x90-0x9B movement commands
        d(0x90, "GOTO", "POSITION_3D", "m", "Navigate to position"),
        d(0x91, "GOTO_WAYPOINT", "UINT16", "", "Navigate to waypoint ID"),
        d(0x92, "FOLLOW_PATH", "PATH", "", "Execute path"),
        d(0x93, "STOP", "NONE", "", "Halt all movement"),
        d(0x94, "HOLD_POSITION", "NONE", "", "Station-keeping"),
        d(0x95, "SET_VELOCITY", "VELOCITY_3D", "m/s", "Set desired velocity"),
        d(0x96, "SET_HEADING", "FLOAT32", "rad", "Turn to heading"),
        d(0x97, "ORBIT", "STRUCT", "", "Orbit a point"),
        d(0x98, "FOLLOW_AGENT", "STRUCT{uuid,dist}", "", "Follow another agent"),
        d(0x99, "RETURN_HOME", "NONE", "", "Navigate to home"),
        d(0x9A, "AVOID", "STRUCT{pos,radius}", "", "Add exclusion zone"),
        d(0x9B, "FORMATION", "STRUCT{type,slot}", "", "Join formation"),
    ],
};

/// PERCEPT-1: visual and sensor perception (domain 0x02).
pub static PERCEPT1: DomainTable = DomainTable {
    domain_id: 0x02,
    name: "PERCEPT-1",
    description: "Visual and sensor perception",
    entries: &[
        // 0x00-0x0C object detection
        d(0x00, "DETECTED_OBJECT", "STRUCT", "", "Detected object with properties"),
        d(0x01, "OBJECT_CLASS", "UINT16", "", "Object class from taxonomy"),
        d(0x02, "OBJECT_CONFIDENCE", "FLOAT16", "", "Detection confidence 0.0-1.0"),
        d(0x03, "BOUNDING_BOX_2D", "ARRAY<FLOAT32,4>", "px", "2D bbox (x, y, width, height)"),
        d(0x04, "BOUNDING_BOX_3D", "STRUCT", "m", "3D bbox (center, dimensions, orientation)"),
        d(0x05, "OBJECT_POSITION", "ARRAY<FLOAT32,3>", "m", "Object centroid in 3D"),
        d(0x06, "OBJECT_VELOCITY", "ARRAY<FLOAT32,3>", "m/s", "Object velocity estimate"),
        d(0x07, "OBJECT_ID", "UINT32", "", "Tracking ID (persistent across frames)"),
        d(0x08, "OBJECT_LIST", "LIST<DETECTED_OBJECT>", "", "Collection of detections"),
        d(0x09, "SEGMENTATION_MASK", "BYTES", "", "Run-length encoded pixel mask"),
        d(0x0A, "KEYPOINT", "ARRAY<FLOAT32,3>", "px", "2D keypoint (x, y, confidence)"),
        d(0x0B, "KEYPOINT_SET", "LIST<KEYPOINT>", "", "Named set of keypoints (skeleton)"),
        d(0x0C, "OBJECT_LABEL", "STRING", "", "Human-readable label"),
        // 0x30-0x3C spatial relations
        d(0x30, "ABOVE", "NONE", "", "Spatial: A is above B"),
        d(0x31, "BELOW", "NONE", "", "Spatial: A is below B"),
        d(0x32, "LEFT_OF", "NONE", "", "Spatial: A is left of B"),
        d(0x33, "RIGHT_OF", "NONE", "", "Spatial: A is right of B"),
        d(0x34, "IN_FRONT_OF", "NONE", "", "Spatial: A is in front of B"),
        d(0x35, "BEHIND", "NONE", "", "Spatial: A is behind B"),
        d(0x36, "INSIDE", "NONE", "", "Spatial: A is inside B"),
        d(0x37, "OUTSIDE", "NONE", "", "Spatial: A is outside B"),
        d(0x38, "ADJACENT", "NONE", "", "Spatial: A is adjacent to B"),
        d(0x39, "FAR_FROM", "NONE", "", "Spatial: A is far from B"),
        d(0x3A, "NEAR", "NONE", "", "Spatial: A is near B"),
        d(0x3B, "ON_TOP_OF", "NONE", "", "Spatial: A is resting on B"),
        d(0x3C, "ATTACHED_TO", "NONE", "", "Spatial: A is physically attached to B"),
        // 0x50-0x57 visual properties
        d(0x50, "COLOR_RGB", "ARRAY<UINT8,3>", "", "Color as (R, G, B)"),
        d(0x51, "COLOR_NAME", "UINT8", "", "Named color index"),
        d(0x52, "TEXTURE", "UINT8", "", "Texture class (smooth, rough, etc.)"),
        d(0x53, "MATERIAL", "UINT8", "", "Material class (metal, wood, etc.)"),
        d(0x54, "SHAPE", "UINT8", "", "Shape class (sphere, cube, etc.)"),
        d(0x55, "SIZE_RELATIVE", "UINT8", "", "Relative size (tiny to huge)"),
        d(0x56, "BRIGHTNESS", "FLOAT16", "lux", "Measured brightness"),
        d(0x57, "TRANSPARENCY", "FLOAT16", "", "Transparency 0.0-1.0"),
        // 0x70-0x79 sensor data
        d(0x70, "LIDAR_SCAN", "LIST<ARRAY<FLOAT32,3>>", "m", "Point cloud from LiDAR"),
        d(0x71, "DEPTH_MAP", "STRUCT{w,h,data}", "m", "Depth image"),
        d(0x72, "CAMERA_INTRINSICS", "STRUCT", "", "Camera calibration matrix"),
        d(0x73, "CAMERA_EXTRINSICS", "STRUCT", "", "Camera pose"),
        d(0x74, "IMAGE_EMBEDDING", "ARRAY<FLOAT16,N>", "", "Feature embedding vector"),
        d(0x75, "AUDIO_LEVEL", "FLOAT16", "dB", "Ambient audio level"),
        d(0x76, "TEMPERATURE", "FLOAT16", "K", "Measured temperature"),
        d(0x77, "HUMIDITY", "FLOAT16", "%", "Relative humidity"),
        d(0x78, "PRESSURE", "FLOAT32", "Pa", "Atmospheric pressure"),
        d(0x79, "IMU_DATA", "STRUCT{accel,gyro,mag}", "", "Inertial measurement unit"),
    ],
};

/// DIAG-1: diagnostics and system health (domain 0x05).
pub static DIAG1: DomainTable = DomainTable {
    domain_id: 0x05,
    name: "DIAG-1",
    description: "Diagnostic and system health reporting",
    entries: &[
        // 0x00-0x09 power and energy
        d(0x00, "BATTERY_LEVEL", "FLOAT16", "%", "Battery state of charge 0-100%"),
        d(0x01, "BATTERY_VOLTAGE", "FLOAT16", "V", "Battery terminal voltage"),
        d(0x02, "BATTERY_CURRENT", "FLOAT16", "A", "Battery discharge current"),
        d(0x03, "BATTERY_TEMP", "FLOAT16", "K", "Battery temperature"),
        d(0x04, "CHARGE_RATE", "FLOAT16", "W", "Current charge rate"),
        d(0x05, "TIME_REMAINING", "FLOAT32", "s", "Estimated runtime remaining"),
        d(0x06, "POWER_CONSUMPTION", "FLOAT16", "W", "Current total power draw"),
        d(0x07, "ENERGY_CONSUMED", "FLOAT32", "J", "Total energy consumed this session"),
        d(0x08, "CHARGING_STATUS", "UINT8", "", "0=discharging, 1=charging, 2=full, 3=fault"),
        d(0x09, "POWER_SOURCE", "UINT8", "", "0=battery, 1=wired, 2=solar, 3=fuel_cell"),
        // 0x20-0x29 compute
        d(0x20, "CPU_LOAD", "FLOAT16", "%", "CPU utilization 0-100%"),
        d(0x21, "GPU_LOAD", "FLOAT16", "%", "GPU utilization 0-100%"),
        d(0x22, "MEMORY_USED", "UINT32", "KB", "Memory in use"),
        d(0x23, "MEMORY_TOTAL", "UINT32", "KB", "Total available memory"),
        d(0x24, "STORAGE_USED", "UINT32", "KB", "Storage in use"),
        d(0x25, "STORAGE_TOTAL", "UINT32", "KB", "Total available storage"),
        d(0x26, "CPU_TEMP", "FLOAT16", "K", "CPU temperature"),
        d(0x27, "GPU_TEMP", "FLOAT16", "K", "GPU temperature"),
        d(0x28, "INFERENCE_RATE", "FLOAT32", "Hz", "AI model inference rate"),
        d(0x29, "MODEL_ID", "STRING", "", "Active AI model identifier"),
        // 0x40-0x46 link quality
        d(0x40, "AILL_SNR", "FLOAT16", "dB", "Current AILL channel SNR"),
        d(0x41, "AILL_BER", "FLOAT32", "", "Current AILL bit error rate"),
        d(0x42, "AILL_THROUGHPUT", "FLOAT32", "bps", "Current effective data rate"),
        d(0x43, "AILL_RETRANSMITS", "UINT16", "", "Retransmission count this session"),
        d(0x44, "AILL_LATENCY", "FLOAT16", "ms", "Round-trip latency estimate"),
        d(0x45, "WIFI_RSSI", "INT8", "dBm", "WiFi signal strength"),
        d(0x46, "NETWORK_STATUS", "UINT8", "", "0=disconnected, 1=connected, 2=limited"),
        // 0x60-0x6B system status
        d(0x60, "UPTIME", "UINT32", "s", "System uptime in seconds"),
        d(0x61, "BOOT_COUNT", "UINT16", "", "Number of system boots"),
        d(0x62, "ERROR_COUNT", "UINT16", "", "Cumulative error count"),
        d(0x63, "LAST_ERROR", "STRUCT{code,msg,ts}", "", "Most recent error record"),
        d(0x64, "HEALTH_STATUS", "UINT8", "", "0=nominal, 1=degraded, 2=critical, 3=emergency"),
        d(0x65, "FIRMWARE_VERSION", "STRING", "", "Firmware/software version string"),
        d(0x66, "HARDWARE_ID", "STRING", "", "Hardware model identifier"),
        d(0x67, "CAPABILITIES_REPORT", "STRUCT", "", "Full capability self-report"),
        d(0x68, "SELF_TEST_RESULT", "STRUCT{pass,details}", "", "Built-in self-test results"),
        d(0x69, "MAINTENANCE_DUE", "TIMESTAMP", "", "Next scheduled maintenance time"),
        d(0x6A, "OPERATING_MODE", "UINT8", "", "0=idle, 1=active, 2=standby, 3=safe_mode, 4=shutdown"),
        d(0x6B, "ACTUATOR_STATUS", "LIST<STRUCT{id,ok,temp}>", "", "Per-actuator health"),
    ],
};

/// PLAN-1: task planning and goal management (domain 0x06).
pub static PLAN1: DomainTable = DomainTable {
    domain_id: 0x06,
    name: "PLAN-1",
    description: "Task planning and goal management",
    entries: &[
        d(0x00, "TASK", "STRUCT{id,type,params}", "", "Task definition"),
        d(0x01, "TASK_ID", "UINT32", "", "Unique task identifier"),
        d(0x02, "TASK_STATUS", "UINT8", "", "0=pending, 1=active, 2=complete, 3=failed, 4=cancelled"),
        d(0x03, "TASK_PRIORITY", "UINT8", "", "Task priority 0-7"),
        d(0x04, "TASK_DEADLINE", "TIMESTAMP", "", "Task completion deadline"),
        d(0x05, "TASK_PROGRESS", "FLOAT16", "%", "Completion percentage 0-100%"),
        d(0x06, "SUBTASK", "STRUCT{id,parent_id}", "", "Subtask with parent reference"),
        d(0x07, "TASK_DEPENDENCY", "STRUCT{task_id,dep_id}", "", "Task A depends on task B"),
        d(0x08, "GOAL", "STRUCT{id,condition}", "", "Goal as a boolean condition"),
        d(0x09, "GOAL_STATUS", "UINT8", "", "0=unachieved, 1=achieved, 2=impossible"),
        d(0x0A, "PLAN", "LIST<TASK>", "", "Ordered plan (sequence of tasks)"),
        d(0x0B, "PLAN_COST", "FLOAT32", "", "Estimated total plan cost"),
        d(0x0C, "PLAN_DURATION", "FLOAT32", "s", "Estimated total plan duration"),
        d(0x0D, "ALLOCATE_TASK", "STRUCT{task_id,agent_id}", "", "Assign task to agent"),
        d(0x0E, "RELEASE_TASK", "UINT32", "", "Unassign/release a task"),
        d(0x0F, "REPLAN_REQUEST", "STRUCT{reason}", "", "Request plan regeneration"),
        d(0x10, "RESOURCE", "STRUCT{type,amount}", "", "Resource requirement or availability"),
        d(0x11, "RESOURCE_CONFLICT", "STRUCT{res,agents}", "", "Resource contention report"),
        d(0x12, "AUCTION_BID", "STRUCT{task_id,cost}", "", "Bid on a task in task auction"),
        d(0x13, "AUCTION_AWARD", "STRUCT{task_id,agent_id}", "", "Award task to winning bidder"),
    ],
};

/// All built-in domain tables, by domain id.
pub static LEVEL1_DOMAINS: &[&DomainTable] = &[&NAV1, &PERCEPT1, &DIAG1, &PLAN1];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_sorted_and_unique() {
        for table in LEVEL1_DOMAINS {
            for window in table.entries.windows(2) {
                assert!(
                    window[0].code < window[1].code,
                    "{} out of order at 0x{:02X}",
                    table.name,
                    window[1].code
                );
            }
        }
    }

    #[test]
    fn test_domain_ids() {
        assert_eq!(NAV1.domain_id, 0x01);
        assert_eq!(PERCEPT1.domain_id, 0x02);
        assert_eq!(DIAG1.domain_id, 0x05);
        assert_eq!(PLAN1.domain_id, 0x06);
    }

    #[test]
    fn test_builtin_ids_distinct_and_registrable() {
        for (i, table) in LEVEL1_DOMAINS.iter().enumerate() {
            assert!(
                (0x01..=0xEF).contains(&table.domain_id),
                "{} uses reserved id 0x{:02X}",
                table.name,
                table.domain_id
            );
            for other in &LEVEL1_DOMAINS[i + 1..] {
                assert_ne!(
                    table.domain_id, other.domain_id,
                    "{} and {} share an id",
                    table.name, other.name
                );
            }
        }
    }

    #[test]
    fn test_entry_lookup() {
        assert_eq!(NAV1.entry(0x00).map(|e| e.mnemonic), Some("POSITION_3D"));
        assert_eq!(NAV1.entry(0x02).map(|e| e.mnemonic), Some("HEADING"));
        assert_eq!(NAV1.entry(0x90).map(|e| e.mnemonic), Some("GOTO"));
        assert_eq!(DIAG1.entry(0x00).map(|e| e.mnemonic), Some("BATTERY_LEVEL"));
        assert_eq!(PLAN1.entry(0x12).map(|e| e.mnemonic), Some("AUCTION_BID"));
        // Gaps between blocks are unassigned
        assert!(NAV1.entry(0x10).is_none());
        assert!(NAV1.entry(0xFF).is_none());
    }

    #[test]
    fn test_table_sizes() {
        assert_eq!(NAV1.len(), 50);
        assert_eq!(PERCEPT1.len(), 44);
        assert_eq!(DIAG1.len(), 39);
        assert_eq!(PLAN1.len(), 20);
        assert!(!NAV1.is_empty());
    }
}
