//! Countries accepted by address merge fields.

use serde::{Deserialize, Serialize};

macro_rules! countries {
    ($($variant:ident => ($name:literal, $code:literal)),* $(,)?) => {
        /// A country, serialized as its two-letter code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Country {
            $(#[serde(rename = $code)] $variant,)*
        }

        impl Country {
            pub const ALL: &'static [Country] = &[$(Country::$variant),*];

            /// Human readable name (e.g. "United Kingdom").
            pub fn name(self) -> &'static str {
                match self {
                    $(Country::$variant => $name,)*
                }
            }

            /// Two-letter code (e.g. "GB").
            pub fn code(self) -> &'static str {
                match self {
                    $(Country::$variant => $code,)*
                }
            }
        }
    };
}

countries! {
    Usa => ("USA", "US"),
    AalandIslands => ("Aaland Islands", "AX"),
    Afghanistan => ("Afghanistan", "AF"),
    Albania => ("Albania", "AL"),
    Algeria => ("Algeria", "DZ"),
    AmericanSamoa => ("American Samoa", "AS"),
    Andorra => ("Andorra", "AD"),
    Angola => ("Angola", "AO"),
    Anguilla => ("Anguilla", "AI"),
    AntiguaAndBarbuda => ("Antigua And Barbuda", "AG"),
    Argentina => ("Argentina", "AR"),
    Armenia => ("Armenia", "AM"),
    Aruba => ("Aruba", "AW"),
    Australia => ("Australia", "AU"),
    Austria => ("Austria", "AT"),
    Azerbaijan => ("Azerbaijan", "AZ"),
    Bahamas => ("Bahamas", "BS"),
    Bahrain => ("Bahrain", "BH"),
    Bangladesh => ("Bangladesh", "BD"),
    Barbados => ("Barbados", "BB"),
    Belarus => ("Belarus", "BY"),
    Belgium => ("Belgium", "BE"),
    Belize => ("Belize", "BZ"),
    Benin => ("Benin", "BJ"),
    Bermuda => ("Bermuda", "BM"),
    Bhutan => ("Bhutan", "BT"),
    Bolivia => ("Bolivia", "BO"),
    BonaireSaintEustatiusAndSaba => ("Bonaire, Saint Eustatius and Saba", "BQ"),
    BosniaAndHerzegovina => ("Bosnia and Herzegovina", "BA"),
    Botswana => ("Botswana", "BW"),
    BouvetIsland => ("Bouvet Island", "BV"),
    Brazil => ("Brazil", "BR"),
    BruneiDarussalam => ("Brunei Darussalam", "BN"),
    Bulgaria => ("Bulgaria", "BG"),
    BurkinaFaso => ("Burkina Faso", "BF"),
    Burundi => ("Burundi", "BI"),
    Cambodia => ("Cambodia", "KH"),
    Cameroon => ("Cameroon", "CM"),
    Canada => ("Canada", "CA"),
    CapeVerde => ("Cape Verde", "CV"),
    CaymanIslands => ("Cayman Islands", "KY"),
    CentralAfricanRepublic => ("Central African Republic", "CF"),
    Chad => ("Chad", "TD"),
    Chile => ("Chile", "CL"),
    China => ("China", "CN"),
    ChristmasIsland => ("Christmas Island", "CX"),
    Colombia => ("Colombia", "CO"),
    Comoros => ("Comoros", "KM"),
    Congo => ("Congo", "CG"),
    CookIslands => ("Cook Islands", "CK"),
    CostaRica => ("Costa Rica", "CR"),
    CoteDivoire => ("Cote D'Ivoire", "CI"),
    Croatia => ("Croatia", "HR"),
    Cuba => ("Cuba", "CU"),
    Curacao => ("Curacao", "CW"),
    Cyprus => ("Cyprus", "CY"),
    CzechRepublic => ("Czech Republic", "CZ"),
    DemocraticRepublicOfTheCongo => ("Democratic Republic of the Congo", "CD"),
    Denmark => ("Denmark", "DK"),
    Djibouti => ("Djibouti", "DJ"),
    Dominica => ("Dominica", "DM"),
    DominicanRepublic => ("Dominican Republic", "DO"),
    Ecuador => ("Ecuador", "EC"),
    Egypt => ("Egypt", "EG"),
    ElSalvador => ("El Salvador", "SV"),
    EquatorialGuinea => ("Equatorial Guinea", "GQ"),
    Eritrea => ("Eritrea", "ER"),
    Estonia => ("Estonia", "EE"),
    Ethiopia => ("Ethiopia", "ET"),
    FalklandIslands => ("Falkland Islands", "FK"),
    FaroeIslands => ("Faroe Islands", "FO"),
    Fiji => ("Fiji", "FJ"),
    Finland => ("Finland", "FI"),
    France => ("France", "FR"),
    FrenchGuiana => ("French Guiana", "GF"),
    FrenchPolynesia => ("French Polynesia", "PF"),
    Gabon => ("Gabon", "GA"),
    Gambia => ("Gambia", "GM"),
    Georgia => ("Georgia", "GE"),
    Germany => ("Germany", "DE"),
    Ghana => ("Ghana", "GH"),
    Gibraltar => ("Gibraltar", "GI"),
    Greece => ("Greece", "GR"),
    Greenland => ("Greenland", "GL"),
    Grenada => ("Grenada", "GD"),
    Guadeloupe => ("Guadeloupe", "GP"),
    Guam => ("Guam", "GU"),
    Guatemala => ("Guatemala", "GT"),
    Guernsey => ("Guernsey", "GG"),
    Guinea => ("Guinea", "GN"),
    Guyana => ("Guyana", "GY"),
    Haiti => ("Haiti", "HT"),
    Honduras => ("Honduras", "HN"),
    HongKong => ("Hong Kong", "HK"),
    Hungary => ("Hungary", "HU"),
    Iceland => ("Iceland", "IS"),
    India => ("India", "IN"),
    Indonesia => ("Indonesia", "ID"),
    Iran => ("Iran", "IR"),
    Iraq => ("Iraq", "IQ"),
    Ireland => ("Ireland", "IE"),
    IsleOfMan => ("Isle of Man", "IM"),
    Israel => ("Israel", "IL"),
    Italy => ("Italy", "IT"),
    Jamaica => ("Jamaica", "JM"),
    Japan => ("Japan", "JP"),
    JerseyChannelIslands => ("Jersey (Channel Islands)", "JC"),
    Jordan => ("Jordan", "JO"),
    Kazakhstan => ("Kazakhstan", "KZ"),
    Kenya => ("Kenya", "KE"),
    Kiribati => ("Kiribati", "KI"),
    Kuwait => ("Kuwait", "KW"),
    Kyrgyzstan => ("Kyrgyzstan", "KG"),
    LaoPeoplesDemocraticRepublic => ("Lao People's Democratic Republic", "LA"),
    Latvia => ("Latvia", "LV"),
    Lebanon => ("Lebanon", "LB"),
    Lesotho => ("Lesotho", "LS"),
    Liberia => ("Liberia", "LR"),
    Libya => ("Libya", "LY"),
    Liechtenstein => ("Liechtenstein", "LI"),
    Lithuania => ("Lithuania", "LT"),
    Luxembourg => ("Luxembourg", "LU"),
    Macau => ("Macau", "MO"),
    Macedonia => ("Macedonia", "MK"),
    Madagascar => ("Madagascar", "MG"),
    Malawi => ("Malawi", "MW"),
    Malaysia => ("Malaysia", "MY"),
    Maldives => ("Maldives", "MV"),
    Mali => ("Mali", "ML"),
    Malta => ("Malta", "MT"),
    MarshallIslands => ("Marshall Islands", "MH"),
    Martinique => ("Martinique", "MQ"),
    Mauritania => ("Mauritania", "MR"),
    Mauritius => ("Mauritius", "MU"),
    Mayotte => ("Mayotte", "YT"),
    Mexico => ("Mexico", "MX"),
    MoldovaRepublicOf => ("Moldova, Republic of", "MD"),
    Monaco => ("Monaco", "MC"),
    Mongolia => ("Mongolia", "MN"),
    Montenegro => ("Montenegro", "ME"),
    Montserrat => ("Montserrat", "MS"),
    Morocco => ("Morocco", "MA"),
    Mozambique => ("Mozambique", "MZ"),
    Myanmar => ("Myanmar", "MM"),
    Namibia => ("Namibia", "NA"),
    Nepal => ("Nepal", "NP"),
    Netherlands => ("Netherlands", "NL"),
    NetherlandsAntilles => ("Netherlands Antilles", "AN"),
    NewCaledonia => ("New Caledonia", "NC"),
    NewZealand => ("New Zealand", "NZ"),
    Nicaragua => ("Nicaragua", "NI"),
    Niger => ("Niger", "NE"),
    Nigeria => ("Nigeria", "NG"),
    Niue => ("Niue", "NU"),
    NorfolkIsland => ("Norfolk Island", "NF"),
    NorthKorea => ("North Korea", "KP"),
    Norway => ("Norway", "NO"),
    Oman => ("Oman", "OM"),
    Pakistan => ("Pakistan", "PK"),
    Palau => ("Palau", "PW"),
    Palestine => ("Palestine", "PS"),
    Panama => ("Panama", "PA"),
    PapuaNewGuinea => ("Papua New Guinea", "PG"),
    Paraguay => ("Paraguay", "PY"),
    Peru => ("Peru", "PE"),
    Philippines => ("Philippines", "PH"),
    Pitcairn => ("Pitcairn", "PN"),
    Poland => ("Poland", "PL"),
    Portugal => ("Portugal", "PT"),
    Qatar => ("Qatar", "QA"),
    RepublicOfKosovo => ("Republic of Kosovo", "XK"),
    Reunion => ("Reunion", "RE"),
    Romania => ("Romania", "RO"),
    Russia => ("Russia", "RU"),
    Rwanda => ("Rwanda", "RW"),
    SaintKittsAndNevis => ("Saint Kitts and Nevis", "KN"),
    SaintLucia => ("Saint Lucia", "LC"),
    SaintMartin => ("Saint Martin", "MF"),
    SaintVincentAndTheGrenadines => ("Saint Vincent and the Grenadines", "VC"),
    SamoaIndependent => ("Samoa (Independent)", "WS"),
    SanMarino => ("San Marino", "SM"),
    SaoTomeAndPrincipe => ("Sao Tome and Principe", "ST"),
    SaudiArabia => ("Saudi Arabia", "SA"),
    Senegal => ("Senegal", "SN"),
    Serbia => ("Serbia", "RS"),
    Seychelles => ("Seychelles", "SC"),
    SierraLeone => ("Sierra Leone", "SL"),
    Singapore => ("Singapore", "SG"),
    SintMaarten => ("Sint Maarten", "SX"),
    Slovakia => ("Slovakia", "SK"),
    Slovenia => ("Slovenia", "SI"),
    SolomonIslands => ("Solomon Islands", "SB"),
    Somalia => ("Somalia", "SO"),
    SouthAfrica => ("South Africa", "ZA"),
    SouthGeorgiaAndTheSouthSandwichIslands => ("South Georgia and the South Sandwich Islands", "GS"),
    SouthKorea => ("South Korea", "KR"),
    SouthSudan => ("South Sudan", "SS"),
    Spain => ("Spain", "ES"),
    SriLanka => ("Sri Lanka", "LK"),
    Sudan => ("Sudan", "SD"),
    Suriname => ("Suriname", "SR"),
    SvalbardAndJanMayenIslands => ("Svalbard and Jan Mayen Islands", "SJ"),
    Swaziland => ("Swaziland", "SZ"),
    Sweden => ("Sweden", "SE"),
    Switzerland => ("Switzerland", "CH"),
    Syria => ("Syria", "SY"),
    Taiwan => ("Taiwan", "TW"),
    Tajikistan => ("Tajikistan", "TJ"),
    Tanzania => ("Tanzania", "TZ"),
    Thailand => ("Thailand", "TH"),
    TimorLeste => ("Timor-Leste", "TL"),
    Togo => ("Togo", "TG"),
    Tonga => ("Tonga", "TO"),
    TrinidadAndTobago => ("Trinidad and Tobago", "TT"),
    Tunisia => ("Tunisia", "TN"),
    Turkey => ("Turkey", "TR"),
    Turkmenistan => ("Turkmenistan", "TM"),
    TurksAndCaicosIslands => ("Turks & Caicos Islands", "TC"),
    Uganda => ("Uganda", "UG"),
    Ukraine => ("Ukraine", "UA"),
    UnitedArabEmirates => ("United Arab Emirates", "AE"),
    UnitedKingdom => ("United Kingdom", "GB"),
    Uruguay => ("Uruguay", "UY"),
    Uzbekistan => ("Uzbekistan", "UZ"),
    Vanuatu => ("Vanuatu", "VU"),
    VaticanCityStateHolySee => ("Vatican City State (Holy See)", "VA"),
    Venezuela => ("Venezuela", "VE"),
    Vietnam => ("Vietnam", "VN"),
    VirginIslandsBritish => ("Virgin Islands (British)", "VG"),
    VirginIslandsUs => ("Virgin Islands (U.S.)", "VI"),
    WesternSahara => ("Western Sahara", "EH"),
    Yemen => ("Yemen", "YE"),
    Zambia => ("Zambia", "ZM"),
    Zimbabwe => ("Zimbabwe", "ZW"),
}

impl Country {
    pub fn from_code(code: &str) -> Option<Country> {
        Self::ALL
            .iter()
            .copied()
            .find(|country| country.code().eq_ignore_ascii_case(code))
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
