//! Standard genetic code.
//!
//! Amino acids are one-letter codes, `*` is a stop.

pub const STOP: u8 = b'*';
pub const START_CODON: [u8; 3] = *b"ATG";

/// Translate one codon (case-insensitive). Returns `None` if any base is not A/C/G/T.
pub fn translate(codon: [u8; 3]) -> Option<u8> {
    let c = codon.map(|b| b.to_ascii_uppercase());
    let aa = match &c {
        b"TTT" | b"TTC" => b'F',
        b"TTA" | b"TTG" | b"CTT" | b"CTC" | b"CTA" | b"CTG" => b'L',
        b"ATT" | b"ATC" | b"ATA" => b'I',
        b"ATG" => b'M',
        b"GTT" | b"GTC" | b"GTA" | b"GTG" => b'V',
        b"TCT" | b"TCC" | b"TCA" | b"TCG" | b"AGT" | b"AGC" => b'S',
        b"CCT" | b"CCC" | b"CCA" | b"CCG" => b'P',
        b"ACT" | b"ACC" | b"ACA" | b"ACG" => b'T',
        b"GCT" | b"GCC" | b"GCA" | b"GCG" => b'A',
        b"TAT" | b"TAC" => b'Y',
        b"TAA" | b"TAG" | b"TGA" => STOP,
        b"CAT" | b"CAC" => b'H',
        b"CAA" | b"CAG" => b'Q',
        b"AAT" | b"AAC" => b'N',
        b"AAA" | b"AAG" => b'K',
        b"GAT" | b"GAC" => b'D',
        b"GAA" | b"GAG" => b'E',
        b"TGT" | b"TGC" => b'C',
        b"TGG" => b'W',
        b"CGT" | b"CGC" | b"CGA" | b"CGG" | b"AGA" | b"AGG" => b'R',
        b"GGT" | b"GGC" | b"GGA" | b"GGG" => b'G',
        _ => return None,
    };
    Some(aa)
}

#[inline]
pub fn is_stop(codon: [u8; 3]) -> bool {
    translate(codon) == Some(STOP)
}

#[inline]
pub fn is_start(codon: [u8; 3]) -> bool {
    codon.map(|b| b.to_ascii_uppercase()) == START_CODON
}

/// Watson-Crick complement; non-ACGT bases map to `N`. Output is upper case.
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        _ => b'N',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_all_64_codons() {
        let bases = [b'A', b'C', b'G', b'T'];
        let mut n = 0;
        for a in bases {
            for b in bases {
                for c in bases {
                    assert!(translate([a, b, c]).is_some());
                    n += 1;
                }
            }
        }
        assert_eq!(n, 64);
    }

    #[test]
    fn stops_and_start() {
        assert!(is_stop(*b"TAA"));
        assert!(is_stop(*b"tag"));
        assert!(is_stop(*b"TGA"));
        assert!(!is_stop(*b"TGG"));
        assert!(is_start(*b"atg"));
        assert_eq!(translate(*b"ATG"), Some(b'M'));
        assert_eq!(translate(*b"ANG"), None);
    }

    #[test]
    fn complement_bases() {
        assert_eq!(complement(b'a'), b'T');
        assert_eq!(complement(b'G'), b'C');
        assert_eq!(complement(b'N'), b'N');
    }
}
