/// Fixed enumeration of the first-level districts the directory service
/// accepts as `signgucode` filters. Listing queries fan out across all of
/// these; adding a district is a data change here, not a code change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Seoul,
    Busan,
    Daegu,
    Incheon,
    Gwangju,
    Daejeon,
    Ulsan,
    Sejong,
    Gyeonggi,
    Gangwon,
    Chungbuk,
    Chungnam,
    Jeonbuk,
    Jeonnam,
    Gyeongbuk,
    Gyeongnam,
    Jeju,
}

impl Region {
    pub const ALL: [Region; 17] = [
        Region::Seoul,
        Region::Busan,
        Region::Daegu,
        Region::Incheon,
        Region::Gwangju,
        Region::Daejeon,
        Region::Ulsan,
        Region::Sejong,
        Region::Gyeonggi,
        Region::Gangwon,
        Region::Chungbuk,
        Region::Chungnam,
        Region::Jeonbuk,
        Region::Jeonnam,
        Region::Gyeongbuk,
        Region::Gyeongnam,
        Region::Jeju,
    ];

    /// District code sent as the `signgucode` query parameter.
    pub fn code(self) -> &'static str {
        match self {
            Region::Seoul => "11",
            Region::Busan => "26",
            Region::Daegu => "27",
            Region::Incheon => "28",
            Region::Gwangju => "29",
            Region::Daejeon => "30",
            Region::Ulsan => "31",
            Region::Sejong => "36",
            Region::Gyeonggi => "41",
            Region::Chungbuk => "43",
            Region::Chungnam => "44",
            Region::Jeonbuk => "45",
            Region::Jeonnam => "46",
            Region::Gyeongbuk => "47",
            Region::Gyeongnam => "48",
            Region::Jeju => "50",
            Region::Gangwon => "51",
        }
    }

    /// Short Korean district name, used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Region::Seoul => "서울",
            Region::Busan => "부산",
            Region::Daegu => "대구",
            Region::Incheon => "인천",
            Region::Gwangju => "광주",
            Region::Daejeon => "대전",
            Region::Ulsan => "울산",
            Region::Sejong => "세종",
            Region::Gyeonggi => "경기",
            Region::Gangwon => "강원",
            Region::Chungbuk => "충북",
            Region::Chungnam => "충남",
            Region::Jeonbuk => "전북",
            Region::Jeonnam => "전남",
            Region::Gyeongbuk => "경북",
            Region::Gyeongnam => "경남",
            Region::Jeju => "제주",
        }
    }

    /// Display label stored on show records. Neighbouring districts share a
    /// merged super-region label, so several regions map to the same value.
    pub fn label(self) -> &'static str {
        match self {
            Region::Gyeonggi | Region::Incheon => "경기/인천",
            Region::Chungbuk | Region::Chungnam => "충청",
            Region::Jeonbuk | Region::Jeonnam => "전라",
            Region::Gyeongbuk | Region::Gyeongnam => "경상",
            other => other.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_are_unique() {
        let codes: HashSet<&str> = Region::ALL.iter().map(|r| r.code()).collect();
        assert_eq!(codes.len(), Region::ALL.len());
    }

    #[test]
    fn merged_labels_cover_neighbouring_districts() {
        assert_eq!(Region::Gyeonggi.label(), "경기/인천");
        assert_eq!(Region::Incheon.label(), "경기/인천");
        assert_eq!(Region::Jeonbuk.label(), "전라");
        assert_eq!(Region::Jeonnam.label(), "전라");
        assert_eq!(Region::Gyeongbuk.label(), "경상");
        assert_eq!(Region::Gyeongnam.label(), "경상");
        assert_eq!(Region::Chungbuk.label(), "충청");
        assert_eq!(Region::Chungnam.label(), "충청");
    }

    #[test]
    fn metro_districts_keep_their_own_label() {
        assert_eq!(Region::Seoul.label(), "서울");
        assert_eq!(Region::Jeju.label(), "제주");
        assert_eq!(Region::Gangwon.label(), "강원");
    }
}
