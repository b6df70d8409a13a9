//! Responses for the hardware configuration, statistics and RF test Commands
use atat::atat_derive::AtatResp;

/// Number of transmit power buckets reported by `+SQNRXTXSTATS`, from
/// above 22 dBm down to 0 dBm and below.
pub const TX_POWER_BUCKETS: usize = 14;

/// Upper bound (dBm) of each transmit power bucket, in reporting order.
pub const TX_POWER_BUCKET_LIMITS: [i8; TX_POWER_BUCKETS] =
    [23, 22, 21, 20, 19, 18, 17, 16, 15, 12, 9, 6, 3, 0];

/// Radio activity statistics +SQNRXTXSTATS, times in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct RxTxStatsResponse {
    #[at_arg(position = 0)]
    pub rx_time: u32,
    #[at_arg(position = 1)]
    pub tx_time: u32,
    #[at_arg(position = 2)]
    pub tx_23: u32,
    #[at_arg(position = 3)]
    pub tx_22: u32,
    #[at_arg(position = 4)]
    pub tx_21: u32,
    #[at_arg(position = 5)]
    pub tx_20: u32,
    #[at_arg(position = 6)]
    pub tx_19: u32,
    #[at_arg(position = 7)]
    pub tx_18: u32,
    #[at_arg(position = 8)]
    pub tx_17: u32,
    #[at_arg(position = 9)]
    pub tx_16: u32,
    #[at_arg(position = 10)]
    pub tx_15: u32,
    #[at_arg(position = 11)]
    pub tx_12: u32,
    #[at_arg(position = 12)]
    pub tx_9: u32,
    #[at_arg(position = 13)]
    pub tx_6: u32,
    #[at_arg(position = 14)]
    pub tx_3: u32,
    #[at_arg(position = 15)]
    pub tx_0: u32,
}

/// Time spent in reception and transmission, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxTxStats {
    pub rx_time: u32,
    pub tx_time: u32,
    /// Transmission time per power bucket, see [`TX_POWER_BUCKET_LIMITS`]
    pub tx_time_by_power: [u32; TX_POWER_BUCKETS],
}

impl From<&RxTxStatsResponse> for RxTxStats {
    fn from(r: &RxTxStatsResponse) -> Self {
        Self {
            rx_time: r.rx_time,
            tx_time: r.tx_time,
            tx_time_by_power: [
                r.tx_23, r.tx_22, r.tx_21, r.tx_20, r.tx_19, r.tx_18, r.tx_17, r.tx_16, r.tx_15,
                r.tx_12, r.tx_9, r.tx_6, r.tx_3, r.tx_0,
            ],
        }
    }
}

/// Continuous wave reception test +SMCWRX, in hundredths of dBm
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct CwRxRssi {
    #[at_arg(position = 0)]
    pub rssi: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rxtx_statistics() {
        let resp: RxTxStatsResponse = atat::serde_at::from_slice(
            b"+SQNRXTXSTATS: 1200,340,0,0,0,10,20,30,40,50,60,70,20,20,10,10",
        )
        .unwrap();
        let stats = RxTxStats::from(&resp);
        assert_eq!(stats.rx_time, 1200);
        assert_eq!(stats.tx_time, 340);
        assert_eq!(stats.tx_time_by_power[3], 10);
        assert_eq!(stats.tx_time_by_power[13], 10);
        assert_eq!(stats.tx_time_by_power.iter().sum::<u32>(), 340);

        assert!(atat::serde_at::from_slice::<RxTxStatsResponse>(b"+SQNRXTXSTATS: 1,2,3").is_err());
    }

    #[test]
    fn cw_rssi() {
        assert_eq!(
            atat::serde_at::from_slice(b"+SMCWRX: -7350"),
            Ok(CwRxRssi { rssi: -7350 })
        );
    }
}
