use crate::fields::{Fq12, Fq2, Fq6, TowerNonResidue};
use crate::bls12_381::{GAMMAS, MODULUS, NON_RESIDUE};

/// The `F_q^2` script builder wired for BLS12-381 (`u^2 = -1`, towering by
/// `v^3 = 1 + u`).
pub fn fq2_script() -> Fq2 {
    Fq2::new(
        MODULUS.clone(),
        NON_RESIDUE.clone(),
        TowerNonResidue::OnePlusU,
    )
}

/// The `F_q^6` script builder wired for BLS12-381.
pub fn fq6_script() -> Fq6 {
    Fq6::new(MODULUS.clone(), fq2_script())
}

/// The `F_q^12` script builder wired for BLS12-381.
pub fn fq12_script() -> Fq12 {
    Fq12::new(MODULUS.clone(), fq6_script(), GAMMAS.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::PrimeFieldExtension;

    #[test]
    fn towers_share_the_characteristic() {
        assert_eq!(fq2_script().modulus(), &*MODULUS);
        assert_eq!(fq6_script().modulus(), &*MODULUS);
        assert_eq!(fq12_script().modulus(), &*MODULUS);
        assert_eq!(fq12_script().extension_degree(), 12);
    }
}
