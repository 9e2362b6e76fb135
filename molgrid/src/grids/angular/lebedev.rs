//! Lebedev-Laikov quadrature rules on the unit sphere.
//!
//! Each rule is stored as a list of orbits of the octahedral group; the
//! points of an orbit share a single weight. Tabulated weights are
//! normalized to sum to 1.
//!
//! V.I. Lebedev and D.N. Laikov, "A quadrature formula for the sphere of the
//! 131st algebraic order of accuracy", Doklady Mathematics 59 (1999) 477-481.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use ndarray::{Array1, Array2};
use once_cell::sync::Lazy;

/// Orbits of the octahedral group, following the `gen_oh` codes of the
/// published Lebedev-Laikov tables
#[derive(Debug, Clone, Copy)]
enum Orbit {
    /// 6 points: `(±1, 0, 0)` and permutations
    A1 { v: f64 },
    /// 12 points: `(0, ±a, ±a)` and permutations, `a = 1/√2`
    A2 { v: f64 },
    /// 8 points: `(±a, ±a, ±a)`, `a = 1/√3`
    A3 { v: f64 },
    /// 24 points: `(±a, ±a, ±b)` and permutations, `b = √(1 - 2a²)`
    Bk { a: f64, v: f64 },
    /// 24 points: `(±a, ±b, 0)` and permutations, `b = √(1 - a²)`
    Ck { a: f64, v: f64 },
    /// 48 points: `(±a, ±b, ±c)` and permutations, `c = √(1 - a² - b²)`
    Dk { a: f64, b: f64, v: f64 },
}

#[derive(Debug)]
struct LebedevTable {
    size: usize,
    degree: usize,
    orbits: &'static [Orbit],
}

#[allow(clippy::excessive_precision)]
static LEBEDEV_TABLES: &[LebedevTable] = &[
    LebedevTable {
        size: 6,
        degree: 3,
        orbits: &[
            Orbit::A1 { v: 0.1666666666666667 },
        ],
    },
    LebedevTable {
        size: 14,
        degree: 5,
        orbits: &[
            Orbit::A1 { v: 0.06666666666666667 },
            Orbit::A3 { v: 0.075 },
        ],
    },
    LebedevTable {
        size: 26,
        degree: 7,
        orbits: &[
            Orbit::A1 { v: 0.04761904761904762 },
            Orbit::A2 { v: 0.0380952380952381 },
            Orbit::A3 { v: 0.03214285714285714 },
        ],
    },
    LebedevTable {
        size: 38,
        degree: 9,
        orbits: &[
            Orbit::A1 { v: 0.009523809523809525 },
            Orbit::A3 { v: 0.03214285714285714 },
            Orbit::Ck { a: 0.4597008433809831, v: 0.02857142857142857 },
        ],
    },
    LebedevTable {
        size: 50,
        degree: 11,
        orbits: &[
            Orbit::A1 { v: 0.0126984126984127 },
            Orbit::A2 { v: 0.02257495590828924 },
            Orbit::A3 { v: 0.02109375 },
            Orbit::Bk { a: 0.3015113445777636, v: 0.02017333553791887 },
        ],
    },
    LebedevTable {
        size: 74,
        degree: 13,
        orbits: &[
            Orbit::A1 { v: 0.0005130671797338464 },
            Orbit::A2 { v: 0.01660406956574204 },
            Orbit::A3 { v: -0.02958603896103896 },
            Orbit::Bk { a: 0.4803844614152614, v: 0.02657620708215946 },
            Orbit::Ck { a: 0.3207726489807764, v: 0.01652217099371571 },
        ],
    },
    LebedevTable {
        size: 86,
        degree: 15,
        orbits: &[
            Orbit::A1 { v: 0.01154401154401154 },
            Orbit::A3 { v: 0.01194390908585628 },
            Orbit::Bk { a: 0.3696028464541502, v: 0.0111105557106034 },
            Orbit::Bk { a: 0.6943540066026664, v: 0.01187650129453714 },
            Orbit::Ck { a: 0.3742430390903412, v: 0.01181230374690448 },
        ],
    },
    LebedevTable {
        size: 110,
        degree: 17,
        orbits: &[
            Orbit::A1 { v: 0.003828270494937162 },
            Orbit::A3 { v: 0.009793737512487513 },
            Orbit::Bk { a: 0.1851156353447362, v: 0.008211737283191111 },
            Orbit::Bk { a: 0.6904210483822922, v: 0.009942814891178103 },
            Orbit::Bk { a: 0.3956894730559419, v: 0.009595471336070962 },
            Orbit::Ck { a: 0.4783690288121502, v: 0.009694996361663029 },
        ],
    },
    LebedevTable {
        size: 146,
        degree: 19,
        orbits: &[
            Orbit::A1 { v: 0.0005996313688621381 },
            Orbit::A2 { v: 0.007372999718620756 },
            Orbit::A3 { v: 0.007210515360144488 },
            Orbit::Bk { a: 0.6764410400114264, v: 0.007116355493117555 },
            Orbit::Bk { a: 0.4174961227965453, v: 0.006753829486314477 },
            Orbit::Bk { a: 0.1574676672039082, v: 0.007574394159054034 },
            Orbit::Dk { a: 0.1403553811713183, b: 0.4493328323269557, v: 0.006991087353303262 },
        ],
    },
    LebedevTable {
        size: 170,
        degree: 21,
        orbits: &[
            Orbit::A1 { v: 0.005544842902037365 },
            Orbit::A2 { v: 0.006071332770670752 },
            Orbit::A3 { v: 0.006383674773515093 },
            Orbit::Bk { a: 0.2551252621114134, v: 0.00518338758774779 },
            Orbit::Bk { a: 0.6743601460362766, v: 0.006317929009813725 },
            Orbit::Bk { a: 0.431891069671941, v: 0.006201670006589077 },
            Orbit::Ck { a: 0.2613931360335988, v: 0.005477143385137348 },
            Orbit::Dk { a: 0.4990453161796037, b: 0.1446630744325115, v: 0.005968383987681156 },
        ],
    },
    LebedevTable {
        size: 194,
        degree: 23,
        orbits: &[
            Orbit::A1 { v: 0.001782340447244611 },
            Orbit::A2 { v: 0.005716905949977102 },
            Orbit::A3 { v: 0.005573383178848738 },
            Orbit::Bk { a: 0.6712973442695226, v: 0.005608704082587997 },
            Orbit::Bk { a: 0.2892465627575439, v: 0.005158237711805383 },
            Orbit::Bk { a: 0.4446933178717437, v: 0.005518771467273614 },
            Orbit::Bk { a: 0.1299335447650067, v: 0.004106777028169394 },
            Orbit::Ck { a: 0.3457702197611283, v: 0.005051846064614808 },
            Orbit::Dk { a: 0.159041710538353, b: 0.8360360154824589, v: 0.005530248916233094 },
        ],
    },
    LebedevTable {
        size: 230,
        degree: 25,
        orbits: &[
            Orbit::A1 { v: -0.05522639919727325 },
            Orbit::A3 { v: 0.004450274607445226 },
            Orbit::Bk { a: 0.4492044687397611, v: 0.004496841067921404 },
            Orbit::Bk { a: 0.2520419490210201, v: 0.00504915345047875 },
            Orbit::Bk { a: 0.6981906658447242, v: 0.003976408018051883 },
            Orbit::Bk { a: 0.658740524346096, v: 0.004401400650381014 },
            Orbit::Bk { a: 0.0403854405009766, v: 0.01724544350544401 },
            Orbit::Ck { a: 0.5823842309715584, v: 0.004231083095357343 },
            Orbit::Ck { a: 0.3545877390518688, v: 0.005198069864064399 },
            Orbit::Dk { a: 0.2272181808998187, b: 0.4864661535886647, v: 0.004695720972568883 },
        ],
    },
    LebedevTable {
        size: 266,
        degree: 27,
        orbits: &[
            Orbit::A1 { v: -0.001313769127326952 },
            Orbit::A2 { v: -0.002522728704859336 },
            Orbit::A3 { v: 0.004186853881700583 },
            Orbit::Bk { a: 0.7039373391585475, v: 0.005315167977810885 },
            Orbit::Bk { a: 0.1012526248572414, v: 0.004047142377086219 },
            Orbit::Bk { a: 0.4647448726420539, v: 0.00411248239440699 },
            Orbit::Bk { a: 0.3277420654971629, v: 0.003595584899758782 },
            Orbit::Bk { a: 0.6620338663699974, v: 0.004256131351428158 },
            Orbit::Ck { a: 0.8506508083520399, v: 0.00422958270064724 },
            Orbit::Dk { a: 0.3233484542692899, b: 0.1153112011009701, v: 0.004080914225780505 },
            Orbit::Dk { a: 0.2314790158712601, b: 0.5244939240922365, v: 0.004071467593830964 },
        ],
    },
    LebedevTable {
        size: 302,
        degree: 29,
        orbits: &[
            Orbit::A1 { v: 0.0008545911725128148 },
            Orbit::A3 { v: 0.003599119285025571 },
            Orbit::Bk { a: 0.3515640345570105, v: 0.003449788424305883 },
            Orbit::Bk { a: 0.6566329410219612, v: 0.003604822601419882 },
            Orbit::Bk { a: 0.4729054132581005, v: 0.003576729661743367 },
            Orbit::Bk { a: 0.09618308522614784, v: 0.002352101413689164 },
            Orbit::Bk { a: 0.2219645236294178, v: 0.003108953122413675 },
            Orbit::Bk { a: 0.7011766416089545, v: 0.003650045807677255 },
            Orbit::Ck { a: 0.2644152887060663, v: 0.002982344963171804 },
            Orbit::Ck { a: 0.5718955891878961, v: 0.00360082093221646 },
            Orbit::Dk { a: 0.2510034751770465, b: 0.8000727494073951, v: 0.003571540554273387 },
            Orbit::Dk { a: 0.1233548532583327, b: 0.4127724083168531, v: 0.00339231220500617 },
        ],
    },
    LebedevTable {
        size: 350,
        degree: 31,
        orbits: &[
            Orbit::A1 { v: 0.003006796749453936 },
            Orbit::A3 { v: 0.003050627745650771 },
            Orbit::Bk { a: 0.7068965463912316, v: 0.001621104600288991 },
            Orbit::Bk { a: 0.4794682625712025, v: 0.003005701484901752 },
            Orbit::Bk { a: 0.1927533154878019, v: 0.002990992529653774 },
            Orbit::Bk { a: 0.6930357961327123, v: 0.002982170644107595 },
            Orbit::Bk { a: 0.3608302115520091, v: 0.002721564237310992 },
            Orbit::Bk { a: 0.6498486161496169, v: 0.003033513795811141 },
            Orbit::Ck { a: 0.1932945013230339, v: 0.003007949555218533 },
            Orbit::Ck { a: 0.3800494919899303, v: 0.002881964603055307 },
            Orbit::Dk { a: 0.2899558825499574, b: 0.7934537856582315, v: 0.002958357626535696 },
            Orbit::Dk { a: 0.09684121455103957, b: 0.8280801506686862, v: 0.003036020026407088 },
            Orbit::Dk { a: 0.1833434647041659, b: 0.9074658265305127, v: 0.002832187403926303 },
        ],
    },
    LebedevTable {
        size: 434,
        degree: 35,
        orbits: &[
            Orbit::A1 { v: 0.0005265897968224436 },
            Orbit::A2 { v: 0.002548219972002607 },
            Orbit::A3 { v: 0.002512317418927307 },
            Orbit::Bk { a: 0.6909346307509111, v: 0.002530403801186355 },
            Orbit::Bk { a: 0.1774836054609158, v: 0.002014279020918528 },
            Orbit::Bk { a: 0.4914342637784746, v: 0.002501725168402936 },
            Orbit::Bk { a: 0.6456664707424256, v: 0.002513267174597564 },
            Orbit::Bk { a: 0.2861289010307638, v: 0.002302694782227416 },
            Orbit::Bk { a: 0.07568084367178018, v: 0.001462495621594614 },
            Orbit::Bk { a: 0.3927259763368002, v: 0.00244537343731298 },
            Orbit::Ck { a: 0.8818132877794288, v: 0.002417442375638981 },
            Orbit::Ck { a: 0.9776428111182649, v: 0.001910951282179532 },
            Orbit::Dk { a: 0.2054823696403044, b: 0.8689460322872412, v: 0.002416930044324775 },
            Orbit::Dk { a: 0.5905157048925271, b: 0.7999278543857286, v: 0.002512236854563495 },
            Orbit::Dk { a: 0.5550152361076807, b: 0.7717462626915901, v: 0.002496644054553086 },
            Orbit::Dk { a: 0.9371809858553722, b: 0.3344363145343455, v: 0.002236607760437849 },
        ],
    },
    LebedevTable {
        size: 590,
        degree: 41,
        orbits: &[
            Orbit::A1 { v: 0.0003095121295313493 },
            Orbit::A3 { v: 0.0018523796985974743 },
            Orbit::Bk { a: 0.7040954938227469, v: 0.0018717906392777298 },
            Orbit::Bk { a: 0.6807744066455242, v: 0.001858812585438302 },
            Orbit::Bk { a: 0.6372546939258752, v: 0.0018520288282962004 },
            Orbit::Bk { a: 0.5044419707800358, v: 0.0018467159561512297 },
            Orbit::Bk { a: 0.42157617840109674, v: 0.001818471778162756 },
            Orbit::Bk { a: 0.3317920736472126, v: 0.0017495646572811359 },
            Orbit::Bk { a: 0.23847367014218973, v: 0.00161721064725438 },
            Orbit::Bk { a: 0.14590364491577992, v: 0.0013847372348516163 },
            Orbit::Bk { a: 0.06095034115508362, v: 0.0009764331165050022 },
            Orbit::Ck { a: 0.6116843442009875, v: 0.0018571611967740673 },
            Orbit::Ck { a: 0.3964755348199858, v: 0.0017051539963958498 },
            Orbit::Ck { a: 0.17247820099077138, v: 0.001300321685886038 },
            Orbit::Dk { a: 0.5610263808622059, b: 0.3518280927733519, v: 0.0018428664729052738 },
            Orbit::Dk { a: 0.4742392842551979, b: 0.26347166559379487, v: 0.0018026589343774367 },
            Orbit::Dk { a: 0.5984126497885379, b: 0.18166408403602102, v: 0.0018498305604436429 },
            Orbit::Dk { a: 0.37910354076955616, b: 0.1720795225656876, v: 0.0017139045071066998 },
            Orbit::Dk { a: 0.2778673190586241, b: 0.08213021581932481, v: 0.0015552136033968 },
            Orbit::Dk { a: 0.5033564271075117, b: 0.08999205842074874, v: 0.0018022391280085143 },
        ],
    },
];

/// A fully expanded Lebedev-Laikov rule, with weights summing to `4π`
#[derive(Debug)]
pub(crate) struct LebedevRule {
    pub(crate) degree: usize,
    pub(crate) points: Array2<f64>,
    pub(crate) weights: Array1<f64>,
}

/// All tabulated rules, ordered by increasing degree
pub(crate) static LEBEDEV_RULES: Lazy<Vec<LebedevRule>> = Lazy::new(|| {
    LEBEDEV_TABLES.iter().map(expand).collect()
});

fn push_signed(points: &mut Vec<[f64; 3]>, weights: &mut Vec<f64>, point: [f64; 3], weight: f64) {
    let signs = |x: f64| if x == 0.0 { vec![x] } else { vec![x, -x] };
    for &x in &signs(point[0]) {
        for &y in &signs(point[1]) {
            for &z in &signs(point[2]) {
                points.push([x, y, z]);
                weights.push(weight);
            }
        }
    }
}

fn expand(table: &LebedevTable) -> LebedevRule {
    let mut points = Vec::with_capacity(table.size);
    let mut weights = Vec::with_capacity(table.size);

    for orbit in table.orbits {
        let (permutations, v) = match *orbit {
            Orbit::A1 { v } => (vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]], v),
            Orbit::A2 { v } => {
                let a = FRAC_1_SQRT_2;
                (vec![[0.0, a, a], [a, 0.0, a], [a, a, 0.0]], v)
            }
            Orbit::A3 { v } => {
                let a = 1.0 / f64::sqrt(3.0);
                (vec![[a, a, a]], v)
            }
            Orbit::Bk { a, v } => {
                let b = f64::sqrt(1.0 - 2.0 * a * a);
                (vec![[a, a, b], [a, b, a], [b, a, a]], v)
            }
            Orbit::Ck { a, v } => {
                let b = f64::sqrt(1.0 - a * a);
                (vec![
                    [a, b, 0.0], [b, a, 0.0],
                    [a, 0.0, b], [b, 0.0, a],
                    [0.0, a, b], [0.0, b, a],
                ], v)
            }
            Orbit::Dk { a, b, v } => {
                let c = f64::sqrt(1.0 - a * a - b * b);
                (vec![[a, b, c], [a, c, b], [b, a, c], [b, c, a], [c, a, b], [c, b, a]], v)
            }
        };

        for point in permutations {
            push_signed(&mut points, &mut weights, point, 4.0 * PI * v);
        }
    }

    debug_assert_eq!(points.len(), table.size);

    let n_points = points.len();
    let points = Array2::from_shape_fn((n_points, 3), |(i, j)| points[i][j]);

    return LebedevRule {
        degree: table.degree,
        points: points,
        weights: Array1::from(weights),
    };
}
