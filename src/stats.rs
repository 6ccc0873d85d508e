// Data produced for the serving layer. Field names are the wire protocol;
// the HTTP layer serializes these as-is and adds nothing.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    #[serde(rename = "TANK")]
    pub tank: TankStats,
    #[serde(rename = "PUMP")]
    pub pump: PumpStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct TankStats {
    /// Fill level in parts-per-thousand.
    #[serde(rename = "LVL")]
    pub level: u16,
    /// Harvested volume: 24h level delta plus what was consumed meanwhile.
    #[serde(rename = "HARV")]
    pub harvest: i32,
    #[serde(rename = "CONS")]
    pub consumption: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PumpStats {
    #[serde(rename = "CUR")]
    pub current_ma: u32,
    /// 1 while the pump is physically drawing load.
    #[serde(rename = "ACTIVE")]
    pub active: u8,
    #[serde(rename = "STATE")]
    pub state: i8,
    #[serde(rename = "STATETEXT")]
    pub state_text: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_serializes_with_wire_keys() {
        let summary = StatsSummary {
            tank: TankStats {
                level: 673,
                harvest: -3,
                consumption: 12,
            },
            pump: PumpStats {
                current_ma: 3032,
                active: 1,
                state: 1,
                state_text: "Running",
            },
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(
            json,
            "{\"TANK\":{\"LVL\":673,\"HARV\":-3,\"CONS\":12},\
             \"PUMP\":{\"CUR\":3032,\"ACTIVE\":1,\"STATE\":1,\"STATETEXT\":\"Running\"}}"
        );
    }
}
